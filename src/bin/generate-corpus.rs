use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use indicatif::ParallelProgressIterator;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::ciphers::heys::{random_round_keys, Heys, RoundKeys, DEFAULT_ROUND_KEYS};
use crate::corpus::Corpus;

#[path = "../mask.rs"]
mod mask;
#[path = "../ciphers/mod.rs"]
mod ciphers;
#[path = "../corpus.rs"]
mod corpus;

#[derive(Parser)]
struct Args {
    /// Where to write the plaintext/ciphertext corpus.
    #[arg(short, long)]
    corpus: PathBuf,
    /// Where to write the round keys used for encryption.
    #[arg(short, long)]
    key: PathBuf,
    /// Draw a fresh key schedule instead of the built-in one.
    #[arg(short, long)]
    generate_key: bool,
    /// Keep only this many plaintexts instead of the full codebook.
    #[arg(short, long)]
    sample: Option<usize>,
}

fn main() -> io::Result<()> {
    let args: Args = Args::parse();
    let seed = [
        9, 14, 2, 5, 0, 12, 7, 3, 1, 15, 4, 11, 13, 6, 10, 8,
        3, 8, 12, 1, 15, 0, 5, 9, 2, 14, 7, 13, 4, 10, 11, 6,
    ];
    let mut rand = ChaCha8Rng::from_seed(seed);

    let keys: RoundKeys =
        if args.generate_key { random_round_keys(&mut rand) } else { DEFAULT_ROUND_KEYS };
    let cipher = Heys::new();

    let plaintexts: Vec<u16> = match args.sample {
        Some(count) => {
            rand::seq::index::sample(&mut rand, 1 << 16, count.min(1 << 16))
                .into_iter()
                .map(|it| it as u16)
                .collect()
        }
        None => (0..=u16::MAX).collect(),
    };

    let entries: HashMap<u16, u16> = plaintexts
        .into_par_iter()
        .progress()
        .map(|plaintext| (plaintext, cipher.encrypt_block(plaintext, &keys)))
        .collect();
    let corpus = Corpus { entries };

    serde_json::ser::to_writer(BufWriter::new(File::create(&args.key)?), &keys)?;
    serde_json::ser::to_writer(BufWriter::new(File::create(&args.corpus)?), &corpus)?;
    println!(
        "{} known blocks under keys {} -> {}",
        corpus.len(),
        args.key.display(),
        args.corpus.display()
    );
    Ok(())
}
