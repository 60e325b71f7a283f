use std::fs::File;
use std::io;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use indicatif::ProgressBar;

use crate::ciphers::heys::{Heys, RoundKeys, DEFAULT_ROUND_KEYS};
use crate::dispatcher::{DispatcherConfig, WorkDispatcher};
use crate::mask::Mask;
use crate::search::{
    single_nibble_seeds, QuantileSchedule, TrailSearchEngine, TrailTable,
};
use crate::transition::{DifferentialTransition, LinearTransition, RoundTransition};

#[path = "../mask.rs"]
mod mask;
#[path = "../ciphers/mod.rs"]
mod ciphers;
#[path = "../dispatcher.rs"]
mod dispatcher;
#[path = "../transition.rs"]
mod transition;
#[path = "../search.rs"]
mod search;

#[derive(Copy, Clone, ValueEnum)]
enum Mode {
    Differential,
    Linear,
}

#[derive(Parser)]
struct Args {
    #[arg(short, long, value_enum)]
    mode: Mode,
    /// Round keys written by generate-corpus; the built-in schedule is
    /// used when absent. Differential trails do not depend on it.
    #[arg(short, long)]
    key: Option<PathBuf>,
    /// Where to write the trail table.
    #[arg(short, long)]
    output: PathBuf,
    /// Seed masks, for instance 0x0c00. All single-nibble masks when empty.
    #[arg(short, long)]
    seed: Vec<String>,
    #[arg(short, long)]
    workers: Option<usize>,
}

fn main() -> io::Result<()> {
    let args: Args = Args::parse();

    let keys: RoundKeys = match &args.key {
        Some(path) => serde_json::de::from_reader(BufReader::new(File::open(path)?))?,
        None => DEFAULT_ROUND_KEYS,
    };
    let seeds = parse_seeds(&args.seed);
    let cipher = Heys::new();
    let config = DispatcherConfig {
        workers: args.workers.unwrap_or(DispatcherConfig::default().workers),
        ..DispatcherConfig::default()
    };

    let table = match args.mode {
        Mode::Differential => {
            let transition = DifferentialTransition::new(&cipher, keys);
            run_search(&transition, QuantileSchedule::differential(), config, &seeds)
        }
        Mode::Linear => {
            let transition = LinearTransition::new();
            run_search(&transition, QuantileSchedule::linear(), config, &seeds)
        }
    };

    report(&table);
    serde_json::ser::to_writer(BufWriter::new(File::create(&args.output)?), &table)?;
    Ok(())
}

fn run_search<T: RoundTransition>(
    transition: &T,
    quantiles: QuantileSchedule,
    config: DispatcherConfig,
    seeds: &[Mask],
) -> TrailTable {
    let engine = TrailSearchEngine::new(transition, quantiles, WorkDispatcher::new(config));
    let progress = ProgressBar::new(seeds.len() as u64);
    let mut table = TrailTable::new();
    for &seed in seeds {
        table.extend(engine.search(&[seed]));
        progress.inc(1);
    }
    progress.finish();
    table
}

fn parse_seeds(words: &[String]) -> Vec<Mask> {
    if words.is_empty() {
        return single_nibble_seeds();
    }
    words
        .iter()
        .map(|word| {
            let digits = word.trim_start_matches("0x");
            Mask(u16::from_str_radix(digits, 16).expect("seed masks are hex words"))
        })
        .collect()
}

fn report(table: &TrailTable) {
    let survivors = table.values().filter(|branch| !branch.is_empty()).count();
    println!("{}/{} seeds kept a trail alive", survivors, table.len());
    let mut strongest: Vec<(Mask, Mask, f64)> = Vec::new();
    for (&seed, branch) in table {
        for (&mask, &weight) in branch {
            strongest.push((seed, mask, weight));
        }
    }
    strongest.sort_by(|a, b| b.2.total_cmp(&a.2));
    for (seed, mask, weight) in strongest.iter().take(10) {
        println!("{seed} -> {mask} : {weight:e}");
    }
}
