mod compare;
mod error;
mod primes;
mod primes_parallel;
mod primes_pool;
mod storage;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::time::Instant;

use crate::primes::{SieveOptions, Strategy};

#[derive(Parser)]
#[command(name = "psieve")]
#[command(about = "Parallel prime sieves - five interchangeable strategies", long_about = None)]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase log verbosity (-v, -vv, -vvv)")]
    verbose: u8,
    #[arg(short, long, global = true, help = "Disable logging")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Find all prime numbers up to a given limit")]
    Primes {
        #[arg(allow_negative_numbers = true, help = "The upper limit to search for primes")]
        limit: i64,
        #[arg(short, long, value_enum, default_value_t = Strategy::Sequential, help = "Sieve strategy to use")]
        strategy: Strategy,
        #[arg(short, long, help = "Number of worker threads (defaults to CPU count)")]
        workers: Option<usize>,
        #[arg(long, help = "Save the primes to primes.txt in the data directory")]
        save: bool,
    },
    #[command(about = "Count the primes up to a given limit")]
    Count {
        #[arg(allow_negative_numbers = true, help = "The upper limit to count primes to")]
        limit: i64,
        #[arg(short, long, value_enum, default_value_t = Strategy::Sequential, help = "Sieve strategy to use")]
        strategy: Strategy,
        #[arg(short, long, help = "Number of worker threads (defaults to CPU count)")]
        workers: Option<usize>,
    },
    #[command(about = "Run every strategy on the same limit, verify they agree and time them")]
    Compare {
        #[arg(allow_negative_numbers = true, help = "The upper limit to search for primes")]
        limit: i64,
        #[arg(short, long, help = "Number of worker threads (defaults to CPU count)")]
        workers: Option<usize>,
        #[arg(short, long, default_value = "5", help = "Trials per strategy")]
        trials: usize,
        #[arg(long, help = "Leave out the O(n√n) trial-division baseline")]
        skip_trial: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Primes {
            limit,
            strategy,
            workers,
            save,
        } => {
            let options = sieve_options(workers);
            if strategy.is_parallel() {
                log::info!(
                    "finding primes up to {} ({}, {} workers)",
                    limit,
                    strategy,
                    options.workers
                );
            } else {
                log::info!("finding primes up to {} ({})", limit, strategy);
            }

            let start = Instant::now();
            let primes = primes::find_primes(limit, strategy, &options)
                .with_context(|| format!("{strategy} sieve failed"))?;
            let duration_us = start.elapsed().as_micros();

            println!("Total: {} primes up to {}", primes.len(), limit);
            if let Some(largest) = primes.last() {
                println!("Largest: {}", largest);
            }
            println!(
                "Execution time: {}us ({:.2}ms)",
                duration_us,
                duration_us as f64 / 1000.0
            );

            record_run("primes", limit, strategy.name(), &options, duration_us, |dir| {
                if save {
                    let path = storage::save_all_primes(dir, &primes)?;
                    println!("Saved primes to {}", path.display());
                }
                Ok(())
            });
        }
        Commands::Count {
            limit,
            strategy,
            workers,
        } => {
            let options = sieve_options(workers);

            let start = Instant::now();
            let count = primes::count_primes(limit, strategy, &options)
                .with_context(|| format!("{strategy} sieve failed"))?;
            let duration_us = start.elapsed().as_micros();

            println!("pi({}) = {}", limit, count);
            println!(
                "Execution time: {}us ({:.2}ms)",
                duration_us,
                duration_us as f64 / 1000.0
            );
            record_run("count", limit, strategy.name(), &options, duration_us, |_| Ok(()));
        }
        Commands::Compare {
            limit,
            workers,
            trials,
            skip_trial,
        } => {
            let options = sieve_options(workers);
            let strategies: Vec<Strategy> = Strategy::ALL
                .into_iter()
                .filter(|s| !(skip_trial && *s == Strategy::TrialDivision))
                .collect();

            let start = Instant::now();
            let reports = compare::run(limit, &strategies, trials, &options)
                .context("strategy comparison failed")?;
            let duration_us = start.elapsed().as_micros();

            compare::print_table(&reports);
            record_run("compare", limit, "all", &options, duration_us, |_| Ok(()));

            let diverged: Vec<&str> = reports
                .iter()
                .filter(|r| !r.matches_reference)
                .map(|r| r.strategy.name())
                .collect();
            if !diverged.is_empty() {
                bail!("strategies diverged from the sequential sieve: {}", diverged.join(", "));
            }
        }
    }

    Ok(())
}

fn sieve_options(workers: Option<usize>) -> SieveOptions {
    workers.map_or_else(SieveOptions::default, SieveOptions::with_workers)
}

/// Persist run artifacts; failures here only warn, the computed result stands.
fn record_run<F>(
    subcommand: &str,
    limit: i64,
    strategy: &str,
    options: &SieveOptions,
    duration_us: u128,
    extra: F,
) where
    F: FnOnce(&std::path::Path) -> std::io::Result<()>,
{
    let Some(data_dir) = storage::get_data_dir() else {
        log::warn!("could not determine data directory, skipping execution log");
        return;
    };

    if let Err(e) = extra(&data_dir) {
        eprintln!("Error saving results: {}", e);
    }
    if let Err(e) = storage::log_execution(
        &data_dir,
        subcommand,
        limit,
        strategy,
        options.workers,
        duration_us,
    ) {
        eprintln!("Warning: Failed to log execution: {}", e);
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}
