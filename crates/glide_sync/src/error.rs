//! # Synchronization Error Types
//!
//! Everything that can go wrong while configuring a synchronizer or moving
//! payloads through the wire codec. Out-of-order snapshots, starved buffers
//! and degenerate splines are not errors: they are handled in place.

use thiserror::Error;

/// Errors that can occur in the synchronization engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// The payload writer ran out of space.
    #[error("payload overflow: need {needed} bytes, {remaining} remaining")]
    PayloadOverflow {
        /// Bytes the write required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// The payload ended before every selected axis was read.
    #[error("payload truncated: need {needed} bytes, {remaining} remaining")]
    PayloadTruncated {
        /// Bytes the read required.
        needed: usize,
        /// Bytes left in the payload.
        remaining: usize,
    },
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;
