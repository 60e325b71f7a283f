use std::fs::File;
use std::io;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::ciphers::heys::Heys;
use crate::corpus::Corpus;
use crate::dispatcher::{DispatcherConfig, WorkDispatcher};
use crate::mask::KeyGuess;
use crate::recovery::{
    select_differential_trails, select_linear_approximations, CandidateKeys,
    DifferentialAttackConfig, DifferentialKeyRecovery, LinearAttackConfig, LinearKeyRecovery,
};
use crate::search::TrailTable;

#[path = "../mask.rs"]
mod mask;
#[path = "../ciphers/mod.rs"]
mod ciphers;
#[path = "../corpus.rs"]
mod corpus;
#[path = "../dispatcher.rs"]
mod dispatcher;
#[path = "../transition.rs"]
mod transition;
#[path = "../search.rs"]
mod search;
#[path = "../recovery.rs"]
mod recovery;

#[derive(Copy, Clone, ValueEnum)]
enum Mode {
    Differential,
    Linear,
}

#[derive(Parser)]
struct Args {
    #[arg(short, long, value_enum)]
    mode: Mode,
    /// Trail table written by search-trails, in the matching mode.
    #[arg(short, long)]
    trails: PathBuf,
    /// Corpus written by generate-corpus.
    #[arg(short, long)]
    corpus: PathBuf,
    /// Where to write the surviving key guesses.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Differential: smallest trail weight worth attacking.
    #[arg(long, default_value_t = 0.0005)]
    min_weight: f64,
    /// Linear: number of approximations to vote with.
    #[arg(long, default_value_t = 100)]
    approximations: usize,
    /// Linear: known texts sampled from the corpus per approximation.
    #[arg(long, default_value_t = 8500)]
    texts: usize,
    #[arg(short, long)]
    workers: Option<usize>,
}

fn main() -> io::Result<()> {
    let args: Args = Args::parse();

    let table: TrailTable = serde_json::de::from_reader(BufReader::new(File::open(&args.trails)?))?;
    let corpus: Corpus = serde_json::de::from_reader(BufReader::new(File::open(&args.corpus)?))?;
    let cipher = Heys::new();
    let config = DispatcherConfig {
        workers: args.workers.unwrap_or(DispatcherConfig::default().workers),
        ..DispatcherConfig::default()
    };

    let candidates = match args.mode {
        Mode::Differential => {
            let trails = select_differential_trails(&table, args.min_weight);
            println!("attacking with {} trails", trails.len());
            let recovery = DifferentialKeyRecovery::new(
                &cipher,
                DifferentialAttackConfig::default(),
                WorkDispatcher::new(config),
            );
            recovery.recover(&trails, &corpus)
        }
        Mode::Linear => {
            let approximations = select_linear_approximations(&table, args.approximations);
            println!("attacking with {} approximations", approximations.len());
            let seed = [
                4, 13, 0, 7, 11, 2, 15, 8, 6, 1, 12, 3, 9, 14, 5, 10,
                12, 7, 2, 15, 0, 10, 5, 8, 14, 3, 6, 11, 1, 13, 4, 9,
            ];
            let texts = corpus.sample(&mut ChaCha8Rng::from_seed(seed), args.texts);
            let recovery = LinearKeyRecovery::new(
                &cipher,
                LinearAttackConfig::default(),
                WorkDispatcher::new(config),
            );
            recovery.recover(&approximations, &texts)
        }
    };

    report(&candidates);
    if let Some(path) = &args.output {
        serde_json::ser::to_writer(BufWriter::new(File::create(path)?), &candidates)?;
    }
    Ok(())
}

fn report(candidates: &CandidateKeys) {
    println!("{} guesses above threshold", candidates.len());
    let mut ranked: Vec<(KeyGuess, u64)> =
        candidates.iter().map(|(&guess, &votes)| (guess, votes)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (guess, votes) in ranked.iter().take(16) {
        println!("{guess} : {votes}");
    }
}
