//! Error taxonomy shared by the collectors and the stores
//!
//! Scraping faults (`ScrapeError`) are per-item and never abort a backfill run.
//! Storage faults (`StorageError`) always escalate to the caller.

use std::fmt;

use thiserror::Error;

/// Fixed failure classes used for retry/abort decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    NotFound,
    Timeout,
    Network,
    Unclassified,
}

impl ErrorClass {
    /// `NotFound` is final for the item; everything else is reselected by the next run.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("Card not found: {card_id}")]
    NotFound { card_id: String },

    #[error("Timeout during {operation}: {message}")]
    Timeout { operation: String, message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("{message}")]
    Unclassified { message: String },
}

impl ScrapeError {
    pub fn not_found(card_id: impl fmt::Display) -> Self {
        Self::NotFound {
            card_id: card_id.to_string(),
        }
    }

    pub fn timeout(operation: &str, message: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Timeout { .. } => ErrorClass::Timeout,
            Self::Network { .. } => ErrorClass::Network,
            Self::Unclassified { .. } => ErrorClass::Unclassified,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        self.class().is_terminal()
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Remote execution failed (status {status:?}): {message}")]
    RemoteExecution { status: Option<i32>, message: String },

    #[error("Unreadable remote output: {reason}")]
    RemoteOutput { reason: String },

    #[error("Invalid stored row: {reason}")]
    InvalidRow { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;
