pub mod heys;

#[allow(dead_code)]
pub trait SymmetricCipher<K, T> {
    fn cipher(&self, key: &K, block: &mut T);
    fn decipher(&self, key: &K, block: &mut T);
}
