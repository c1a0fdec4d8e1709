//! Data-decomposed parallel sieve.
//!
//! The outer loop over candidate primes stays sequential; only the clearing of one
//! prime's multiples fans out. Each worker gets exclusive `&mut` access to a
//! disjoint slice of the marking array, so no cell is ever written by two workers.

use std::panic::{self, AssertUnwindSafe};

use log::{debug, trace, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::error::{Result, SieveError};
use crate::primes::{SIEVE_MIN, SieveOptions, collect_marked, new_marks, validate_bound};

/// Smallest piece of the range handed to a single worker.
const MIN_CHUNK_LEN: usize = 1024;

/// How the range `[p², n]` is split across workers for one prime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decomposition {
    /// One contiguous chunk per worker
    Chunked,
    /// Rayon's adaptive splitting, idle workers steal halves of busy ones
    WorkStealing,
}

pub fn find_primes(
    limit: i64,
    decomposition: Decomposition,
    options: &SieveOptions,
) -> Result<Vec<usize>> {
    let limit = validate_bound(limit, SIEVE_MIN)?;
    let workers = options.workers.max(1);

    let mut is_prime = new_marks(limit);
    let fan_outs = match decomposition {
        Decomposition::Chunked => {
            mark_composites(&mut is_prime, workers, |range, offset, prime| {
                let chunk_len = range.len().div_ceil(workers).max(MIN_CHUNK_LEN);
                clear_multiples_chunked(range, offset, prime, chunk_len);
            })?
        }
        Decomposition::WorkStealing => {
            mark_composites(&mut is_prime, workers, clear_multiples_stealing)?
        }
    };

    debug!(
        "{:?} sieve up to {} finished: {} fan-outs on {} workers",
        decomposition, limit, fan_outs, workers
    );

    Ok(collect_marked(is_prime))
}

/// Drive the sequential outer loop, handing each surviving prime's range
/// `[p², n]` to `clear` on a pool of `workers` threads. Returns the number of
/// fan-outs issued.
///
/// `clear(range, offset, prime)` receives the slice starting at number `offset`.
/// A panic inside it stops the loop and comes back as `WorkerPanicked`; rayon has
/// already joined the rest of that fan-out by the time it resurfaces here.
fn mark_composites<F>(is_prime: &mut [bool], workers: usize, clear: F) -> Result<usize>
where
    F: Fn(&mut [bool], usize, usize) + Sync,
{
    let limit = is_prime.len() - 1;
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("psieve-mark-{i}"))
        .build()?;

    let mut fan_outs = 0_usize;
    for i in 2..=limit.isqrt() {
        // Reads only after every clear for smaller primes has landed
        if !is_prime[i] {
            continue;
        }

        let start = i * i;
        trace!("clearing multiples of {} over [{}, {}]", i, start, limit);

        let range = &mut is_prime[start..];
        // install() returns once the whole fan-out for `i` has completed
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pool.install(|| clear(range, start, i))
        }));
        if outcome.is_err() {
            warn!("clearing multiples of {} panicked", i);
            return Err(SieveError::WorkerPanicked { prime: i });
        }
        fan_outs += 1;
    }

    Ok(fan_outs)
}

/// Clear every cell of `range` whose number (`offset + index`) is divisible by `prime`.
///
/// The divisibility test makes each chunk independent of where the chunk starts.
fn clear_multiples_chunked(range: &mut [bool], offset: usize, prime: usize, chunk_len: usize) {
    range
        .par_chunks_mut(chunk_len)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let base = offset + chunk_idx * chunk_len;
            for (idx, cell) in chunk.iter_mut().enumerate() {
                if (base + idx) % prime == 0 {
                    *cell = false;
                }
            }
        });
}

fn clear_multiples_stealing(range: &mut [bool], offset: usize, prime: usize) {
    range
        .par_iter_mut()
        .enumerate()
        .with_min_len(MIN_CHUNK_LEN)
        .for_each(|(idx, cell)| {
            if (offset + idx) % prime == 0 {
                *cell = false;
            }
        });
}
