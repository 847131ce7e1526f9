//! Network-layer errors.
//!
//! Ordinary unreliability (drops, rate-limit blocks, duplicates) is not an
//! error: it is the simulated transport's whole purpose and is reported
//! through [`crate::sim_transport::NetworkStats`], not `Result`. This type
//! exists for genuine misconfiguration.

use thiserror::Error;

/// Errors constructing or configuring a transport.
#[derive(Debug, Error, PartialEq)]
pub enum NetworkError {
    /// `loss_rate` must be a probability.
    #[error("loss_rate must be within [0.0, 1.0], got {0}")]
    InvalidLossRate(f64),
    /// `duplicate_rate` must be a probability.
    #[error("duplicate_rate must be within [0.0, 1.0], got {0}")]
    InvalidDuplicateRate(f64),
    /// A delay range must not be inverted.
    #[error("delay_range minimum {0} exceeds maximum {1}")]
    InvalidDelayRange(f64, f64),
}

/// Convenience alias.
pub type NetworkResult<T> = Result<T, NetworkError>;
