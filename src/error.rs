use std::fmt;

use thiserror::Error;

/// Minimum-value precondition a strategy places on its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundConstraint {
    /// The bound must be at least this value (1 for trial division, 2 for every sieve)
    AtLeast(i64),
    /// The bound must fit in the address space as an array index
    Addressable,
}

impl fmt::Display for BoundConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundConstraint::AtLeast(minimum) => write!(f, "n >= {minimum}"),
            BoundConstraint::Addressable => write!(f, "n <= usize::MAX"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SieveError {
    /// Raised before any marking work begins
    #[error("bound {value} is out of range (requires {constraint})")]
    InvalidBound {
        value: i64,
        constraint: BoundConstraint,
    },

    /// A marking task died; every other worker has been joined
    #[error("marking task for prime {prime} panicked")]
    WorkerPanicked { prime: usize },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, SieveError>;
