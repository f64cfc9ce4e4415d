//! Error types for the datdisk archive reader.

use std::io;
use thiserror::Error;

/// The result type used throughout datdisk.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for archive operations.
///
/// A missing ID is never an error: lookups report it as `None`. Every
/// variant here means the operation failed and any bytes it wrote into a
/// caller's buffer must not be trusted.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred, including short reads at the end of the file.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Structural corruption was detected in the header or a node record.
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// A successor pointer carried the corruption flag.
    #[error("Chain corruption: block {block:#x} has the corruption flag set")]
    ChainFlagged {
        /// Absolute offset of the block whose successor pointer was flagged.
        block: u32,
    },

    /// A chain ended before the requested length was read.
    #[error("Chain truncated: {remaining} bytes still outstanding")]
    ChainTruncated {
        /// Number of payload bytes that could not be read.
        remaining: usize,
    },

    /// A chain or node was requested at block address zero.
    #[error("Invalid block address: {0:#x}")]
    InvalidAddress(u32),

    /// An invalid argument was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A configuration file could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Creates a new corruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Returns true if the error was caused by bad on-disk data rather than
    /// by the device.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::Corruption(_) | Error::ChainFlagged { .. } | Error::ChainTruncated { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
