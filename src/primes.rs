use std::fmt;

use clap::ValueEnum;

use crate::error::{BoundConstraint, Result, SieveError};
use crate::primes_parallel::{self, Decomposition};
use crate::primes_pool;

/// Algorithm used to find the primes up to a bound.
///
/// Every strategy returns the same ascending sequence for the same valid bound;
/// they differ only in how the composite-marking phase is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Strategy {
    /// O(n√n) divisibility scan, used as the correctness oracle
    TrialDivision,
    /// Classic sequential sieve of Eratosthenes
    Sequential,
    /// Sequential outer loop, inner clearing split into contiguous chunks per worker
    DataDecomposed,
    /// Sequential outer loop, inner clearing split by work stealing
    BasicPrimes,
    /// One pooled task per basic prime over the whole range, joined by a barrier
    WorkPooled,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::TrialDivision,
        Strategy::Sequential,
        Strategy::DataDecomposed,
        Strategy::BasicPrimes,
        Strategy::WorkPooled,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::TrialDivision => "trial-division",
            Strategy::Sequential => "sequential",
            Strategy::DataDecomposed => "data-decomposed",
            Strategy::BasicPrimes => "basic-primes",
            Strategy::WorkPooled => "work-pooled",
        }
    }

    pub fn is_parallel(self) -> bool {
        matches!(
            self,
            Strategy::DataDecomposed | Strategy::BasicPrimes | Strategy::WorkPooled
        )
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tuning knobs shared by the parallel strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SieveOptions {
    pub workers: usize,
}

impl SieveOptions {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
}

impl Default for SieveOptions {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::with_workers(workers)
    }
}

/// Find all primes `<= limit` with the given strategy.
pub fn find_primes(limit: i64, strategy: Strategy, options: &SieveOptions) -> Result<Vec<usize>> {
    match strategy {
        Strategy::TrialDivision => find_primes_trial_division(limit),
        Strategy::Sequential => find_primes_sequential(limit),
        Strategy::DataDecomposed => {
            primes_parallel::find_primes(limit, Decomposition::Chunked, options)
        }
        Strategy::BasicPrimes => {
            primes_parallel::find_primes(limit, Decomposition::WorkStealing, options)
        }
        Strategy::WorkPooled => primes_pool::find_primes(limit, options),
    }
}

/// π(limit): how many primes are `<= limit`.
pub fn count_primes(limit: i64, strategy: Strategy, options: &SieveOptions) -> Result<usize> {
    Ok(find_primes(limit, strategy, options)?.len())
}

/// Smallest bound trial division accepts.
pub(crate) const TRIAL_DIVISION_MIN: i64 = 1;
/// Smallest bound every sieve accepts.
pub(crate) const SIEVE_MIN: i64 = 2;

/// Check `limit` against the minimum a strategy accepts and convert it to an index.
pub(crate) fn validate_bound(limit: i64, minimum: i64) -> Result<usize> {
    if limit < minimum {
        return Err(SieveError::InvalidBound {
            value: limit,
            constraint: BoundConstraint::AtLeast(minimum),
        });
    }
    usize::try_from(limit).map_err(|_| SieveError::InvalidBound {
        value: limit,
        constraint: BoundConstraint::Addressable,
    })
}

/// Fresh marking array for `0..=limit`: everything from 2 upward starts out prime.
pub(crate) fn new_marks(limit: usize) -> Vec<bool> {
    let mut is_prime = vec![true; limit + 1];
    is_prime[0] = false;
    if limit >= 1 {
        is_prime[1] = false;
    }
    is_prime
}

/// Indices still marked prime, ascending.
pub(crate) fn collect_marked<I>(marks: I) -> Vec<usize>
where
    I: IntoIterator<Item = bool>,
{
    marks
        .into_iter()
        .enumerate()
        .filter_map(|(num, prime)| if prime { Some(num) } else { None })
        .collect()
}

/// Run the sequential sieve over `0..=limit` and return the marking array.
///
/// No validation: a `limit` below 2 just yields an array with nothing marked,
/// which the pooled strategy relies on for its √n sub-sieve.
pub(crate) fn sieve_marks(limit: usize) -> Vec<bool> {
    let mut is_prime = new_marks(limit);

    for i in 2..=limit.isqrt() {
        if is_prime[i] {
            let mut j = i * i;
            while j <= limit {
                is_prime[j] = false;
                j += i;
            }
        }
    }

    is_prime
}

/// Sequential sieve of Eratosthenes.
///
/// - Time complexity: O(n log log n)
/// - Space complexity: O(n), one byte per number
/// - Reference output for every other sieve
pub fn find_primes_sequential(limit: i64) -> Result<Vec<usize>> {
    let limit = validate_bound(limit, SIEVE_MIN)?;
    Ok(collect_marked(sieve_marks(limit)))
}

/// Trial division: `k` is prime when nothing in `2..=√k` divides it.
///
/// O(n√n); only here as the oracle the sieves are tested against.
pub fn find_primes_trial_division(limit: i64) -> Result<Vec<usize>> {
    let limit = validate_bound(limit, TRIAL_DIVISION_MIN)?;

    Ok((2..=limit)
        .filter(|&k| (2..=k.isqrt()).all(|d| k % d != 0))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SieveOptions {
        SieveOptions::with_workers(4)
    }

    #[test]
    fn test_small_bounds_known_values() {
        for strategy in Strategy::ALL {
            let opts = options();
            assert_eq!(find_primes(2, strategy, &opts).unwrap(), vec![2], "{strategy}");
            assert_eq!(find_primes(3, strategy, &opts).unwrap(), vec![2, 3], "{strategy}");
            assert_eq!(
                find_primes(10, strategy, &opts).unwrap(),
                vec![2, 3, 5, 7],
                "{strategy}"
            );
            assert_eq!(
                find_primes(30, strategy, &opts).unwrap(),
                vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29],
                "{strategy}"
            );
        }
    }

    #[test]
    fn test_prime_counts() {
        for strategy in Strategy::ALL {
            assert_eq!(count_primes(100, strategy, &options()).unwrap(), 25, "{strategy}");
            assert_eq!(count_primes(1000, strategy, &options()).unwrap(), 168, "{strategy}");
        }
        for strategy in Strategy::ALL.into_iter().filter(|s| *s != Strategy::TrialDivision) {
            assert_eq!(
                count_primes(100_000, strategy, &options()).unwrap(),
                9592,
                "{strategy}"
            );
        }
    }

    #[test]
    fn test_every_strategy_matches_trial_division_up_to_500() {
        let opts = options();
        for n in 2..=500 {
            let oracle = find_primes_trial_division(n).unwrap();
            for strategy in Strategy::ALL {
                assert_eq!(
                    find_primes(n, strategy, &opts).unwrap(),
                    oracle,
                    "{strategy} disagrees at n = {n}"
                );
            }
        }
    }

    #[test]
    fn test_spot_checks_against_oracle() {
        let opts = options();
        let oracle = find_primes_trial_division(1000).unwrap();
        for strategy in Strategy::ALL {
            assert_eq!(find_primes(1000, strategy, &opts).unwrap(), oracle, "{strategy}");
        }

        let oracle = find_primes_trial_division(100_000).unwrap();
        assert_eq!(find_primes_sequential(100_000).unwrap(), oracle);
        for strategy in Strategy::ALL.into_iter().filter(|s| s.is_parallel()) {
            assert_eq!(find_primes(100_000, strategy, &opts).unwrap(), oracle, "{strategy}");
        }
    }

    #[test]
    fn test_results_strictly_increasing() {
        let opts = options();
        for n in [2, 17, 97, 256, 1024, 4099] {
            for strategy in Strategy::ALL {
                let primes = find_primes(n, strategy, &opts).unwrap();
                assert!(primes.windows(2).all(|w| w[0] < w[1]), "{strategy} at n = {n}");
                assert!(primes.iter().all(|&p| p >= 2 && (p as i64) <= n));
            }
        }
    }

    #[test]
    fn test_one_rejected_by_sieves_only() {
        let opts = options();
        assert_eq!(find_primes_trial_division(1).unwrap(), Vec::<usize>::new());

        for strategy in Strategy::ALL.into_iter().filter(|s| *s != Strategy::TrialDivision) {
            match find_primes(1, strategy, &opts) {
                Err(SieveError::InvalidBound { value, constraint }) => {
                    assert_eq!(value, 1);
                    assert_eq!(constraint, BoundConstraint::AtLeast(2));
                }
                other => panic!("{strategy} accepted n = 1: {other:?}"),
            }
        }
    }

    #[test]
    fn test_zero_and_negative_rejected_everywhere() {
        let opts = options();
        for n in [0, -1, -500, i64::MIN] {
            for strategy in Strategy::ALL {
                let err = find_primes(n, strategy, &opts).unwrap_err();
                match err {
                    SieveError::InvalidBound { value, .. } => assert_eq!(value, n),
                    other => panic!("{strategy} returned unexpected error: {other}"),
                }
            }
        }
        let err = find_primes_trial_division(0).unwrap_err();
        assert!(matches!(
            err,
            SieveError::InvalidBound {
                constraint: BoundConstraint::AtLeast(1),
                ..
            }
        ));
    }

    #[test]
    fn test_validate_bound_reports_requested_minimum() {
        assert_eq!(validate_bound(1, TRIAL_DIVISION_MIN).unwrap(), 1);
        assert_eq!(validate_bound(2, SIEVE_MIN).unwrap(), 2);

        for (limit, minimum) in [(0, TRIAL_DIVISION_MIN), (1, SIEVE_MIN), (-7, SIEVE_MIN)] {
            match validate_bound(limit, minimum) {
                Err(SieveError::InvalidBound { value, constraint }) => {
                    assert_eq!(value, limit);
                    assert_eq!(constraint, BoundConstraint::AtLeast(minimum));
                }
                other => panic!("{limit} accepted with minimum {minimum}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_error_message_carries_value_and_constraint() {
        let err = find_primes_sequential(-3).unwrap_err();
        assert_eq!(err.to_string(), "bound -3 is out of range (requires n >= 2)");
    }

    #[test]
    fn test_sieve_marks_below_two_is_empty() {
        assert!(collect_marked(sieve_marks(0)).is_empty());
        assert!(collect_marked(sieve_marks(1)).is_empty());
        assert_eq!(collect_marked(sieve_marks(2)), vec![2]);
    }

    #[test]
    fn test_zero_workers_clamped_to_one() {
        assert_eq!(SieveOptions::with_workers(0).workers, 1);
        let opts = SieveOptions { workers: 0 };
        assert_eq!(count_primes(100, Strategy::WorkPooled, &opts).unwrap(), 25);
        assert_eq!(count_primes(100, Strategy::DataDecomposed, &opts).unwrap(), 25);
    }
}
