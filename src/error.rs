//! Error types for treefs

use thiserror::Error;

/// Failure results of filesystem operations.
///
/// These are ordinary outcomes, not process failures: every operation reports
/// one of these after releasing the locks it took.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    #[error("not found")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("already exists")]
    AlreadyExists,
    #[error("directory not empty")]
    NotEmpty,
    #[error("inode table full")]
    TableFull,
    #[error("no free directory slot")]
    NoFreeSlot,
    #[error("invalid move")]
    InvalidMove,
    #[error("invalid path")]
    InvalidPath,
}

impl FsError {
    /// Numeric code sent back to remote clients. Success is 0, node ids are
    /// non-negative, so every failure maps to a negative value.
    pub fn code(self) -> i32 {
        match self {
            FsError::NotFound => -1,
            FsError::NotADirectory => -2,
            FsError::AlreadyExists => -3,
            FsError::NotEmpty => -4,
            FsError::TableFull => -5,
            FsError::NoFreeSlot => -6,
            FsError::InvalidMove => -7,
            FsError::InvalidPath => -8,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(FsError::NotFound),
            -2 => Some(FsError::NotADirectory),
            -3 => Some(FsError::AlreadyExists),
            -4 => Some(FsError::NotEmpty),
            -5 => Some(FsError::TableFull),
            -6 => Some(FsError::NoFreeSlot),
            -7 => Some(FsError::InvalidMove),
            -8 => Some(FsError::InvalidPath),
            _ => None,
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;

/// Process-level errors: configuration, I/O, command intake and transport.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid command on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Filesystem error: {0}")]
    Fs(#[from] FsError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
