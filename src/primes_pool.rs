//! Work-pooled sieve.
//!
//! Phase 1 sieves `[2, √n]` sequentially to get the complete list of basic primes.
//! Phase 2 queues one task per basic prime on a fixed pool of scoped workers; each
//! task walks its own prime's progression over the whole range. Progressions of
//! different primes overlap (6 is cleared by both 2 and 3), so the marking array is
//! made of atomics and every write is a relaxed `store(false)`. Writes never depend
//! on what was read, so the final array is the same in every interleaving.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel::unbounded;
use crossbeam_utils::sync::WaitGroup;
use log::{debug, trace, warn};

use crate::error::{Result, SieveError};
use crate::primes::{SIEVE_MIN, SieveOptions, collect_marked, sieve_marks, validate_bound};

/// One unit of phase 2 work. Dropping `done` counts the task down on the barrier.
struct MarkTask {
    prime: usize,
    done: WaitGroup,
}

pub fn find_primes(limit: i64, options: &SieveOptions) -> Result<Vec<usize>> {
    let limit = validate_bound(limit, SIEVE_MIN)?;

    let sqrt_limit = limit.isqrt();
    let basic_primes = collect_marked(sieve_marks(sqrt_limit));
    debug!(
        "found {} basic primes up to {}",
        basic_primes.len(),
        sqrt_limit
    );

    let is_prime: Vec<AtomicBool> = (0..=limit).map(|i| AtomicBool::new(i >= 2)).collect();

    run_marking_tasks(&is_prime, &basic_primes, options.workers, clear_multiples)?;

    Ok(collect_marked(
        is_prime.into_iter().map(AtomicBool::into_inner),
    ))
}

/// Strided walk over `prime²..=n`.
fn clear_multiples(is_prime: &[AtomicBool], prime: usize) {
    let limit = is_prime.len() - 1;
    let mut j = prime * prime;
    while j <= limit {
        is_prime[j].store(false, Ordering::Relaxed);
        j += prime;
    }
}

/// Fan `task` out over `basic_primes` and block until every task has finished.
///
/// A panicking task is caught on its worker so that the barrier still counts it
/// down; the first failure is reported once all workers have been joined.
fn run_marking_tasks<F>(
    is_prime: &[AtomicBool],
    basic_primes: &[usize],
    workers: usize,
    task: F,
) -> Result<()>
where
    F: Fn(&[AtomicBool], usize) + Sync,
{
    if basic_primes.is_empty() {
        return Ok(());
    }

    let num_workers = workers.max(1).min(basic_primes.len());
    let (sender, receiver) = unbounded::<MarkTask>();
    let failed_prime = AtomicUsize::new(0);

    thread::scope(|scope| {
        for worker_id in 0..num_workers {
            let receiver = receiver.clone();
            let task = &task;
            let failed_prime = &failed_prime;

            scope.spawn(move || {
                let mut completed = 0_usize;

                for MarkTask { prime, done } in receiver.iter() {
                    trace!("worker {} clearing multiples of {}", worker_id, prime);

                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(is_prime, prime)));
                    if outcome.is_err() {
                        warn!("marking task for prime {} panicked", prime);
                        // Keep the first failure; later ones only get logged
                        let _ = failed_prime.compare_exchange(
                            0,
                            prime,
                            Ordering::Relaxed,
                            Ordering::Relaxed,
                        );
                    }

                    completed += 1;
                    drop(done);
                }

                trace!("worker {} drained queue after {} tasks", worker_id, completed);
            });
        }

        let barrier = WaitGroup::new();
        for &prime in basic_primes {
            // A rejected send hands the task back and drops it, which still counts down
            let _ = sender.send(MarkTask {
                prime,
                done: barrier.clone(),
            });
        }
        drop(sender);

        barrier.wait();
        debug!(
            "{} marking tasks completed on {} workers",
            basic_primes.len(),
            num_workers
        );
    });

    match failed_prime.load(Ordering::Relaxed) {
        0 => Ok(()),
        prime => Err(SieveError::WorkerPanicked { prime }),
    }
}
