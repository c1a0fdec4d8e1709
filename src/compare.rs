use std::time::{Duration, Instant};

use log::{info, warn};

use crate::error::Result;
use crate::primes::{self, SieveOptions, Strategy};

/// Timings and verdict for one strategy over repeated trials.
#[derive(Debug, Clone)]
pub struct StrategyReport {
    pub strategy: Strategy,
    pub prime_count: usize,
    pub best: Duration,
    pub mean: Duration,
    pub worst: Duration,
    /// Every trial produced exactly the reference sequence
    pub matches_reference: bool,
}

/// Run each of `strategies` `trials` times and check every result against the
/// sequential sieve.
pub fn run(
    limit: i64,
    strategies: &[Strategy],
    trials: usize,
    options: &SieveOptions,
) -> Result<Vec<StrategyReport>> {
    let trials = trials.max(1);
    let reference = primes::find_primes_sequential(limit)?;
    info!(
        "reference: {} primes up to {}, {} trials per strategy",
        reference.len(),
        limit,
        trials
    );

    let mut reports = Vec::with_capacity(strategies.len());
    for &strategy in strategies {
        let mut timings = Vec::with_capacity(trials);
        let mut matches_reference = true;
        let mut prime_count = 0;

        for trial in 0..trials {
            let start = Instant::now();
            let found = primes::find_primes(limit, strategy, options)?;
            timings.push(start.elapsed());

            if found != reference {
                warn!(
                    "{} diverged from the sequential sieve on trial {}",
                    strategy, trial
                );
                matches_reference = false;
            }
            prime_count = found.len();
        }

        reports.push(StrategyReport {
            strategy,
            prime_count,
            best: timings.iter().copied().min().unwrap_or_default(),
            mean: mean_duration(&timings),
            worst: timings.iter().copied().max().unwrap_or_default(),
            matches_reference,
        });
    }

    Ok(reports)
}

pub fn print_table(reports: &[StrategyReport]) {
    println!(
        "{:<16} {:>10} {:>12} {:>12} {:>12}  {}",
        "strategy", "primes", "best", "mean", "worst", "result"
    );
    println!("{}", "-".repeat(74));
    for report in reports {
        println!(
            "{:<16} {:>10} {:>10.2}ms {:>10.2}ms {:>10.2}ms  {}",
            report.strategy.name(),
            report.prime_count,
            as_ms(report.best),
            as_ms(report.mean),
            as_ms(report.worst),
            if report.matches_reference { "ok" } else { "MISMATCH" }
        );
    }
}

/// Floor of the average, computed in nanoseconds so any trial count divides safely.
fn mean_duration(timings: &[Duration]) -> Duration {
    if timings.is_empty() {
        return Duration::ZERO;
    }
    let total: u128 = timings.iter().map(Duration::as_nanos).sum();
    let mean = total / timings.len() as u128;
    Duration::from_nanos(u64::try_from(mean).unwrap_or(u64::MAX))
}

fn as_ms(duration: Duration) -> f64 {
    duration.as_micros() as f64 / 1000.0
}
