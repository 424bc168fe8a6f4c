//! Error kinds for catalog, account, ledger and snapshot operations.

use std::path::PathBuf;
use thiserror::Error;

/// Every failure a domain operation can report.
///
/// The REPL renders these as messages; none of them ends the session except
/// a `PersistenceFailure` the operator declines to retry.
#[derive(Debug, Error)]
pub enum PosError {
    /// No menu item or user with that name.
    #[error("'{0}' not found")]
    NotFound(String),

    /// Negative amount, or a quantity above the remaining stock.
    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount { amount: i64, reason: String },

    /// Username/password pair did not match any account.
    #[error("invalid username or password")]
    AuthFailed,

    /// A menu item with this name already exists.
    #[error("menu item '{0}' already exists")]
    DuplicateName(String),

    #[error("menu item name must not be empty")]
    InvalidName,

    #[error("password must not be empty")]
    InvalidCredential,

    /// Ledger operation attempted before any order was started.
    #[error("no order has been started")]
    NoOrder,

    /// The current role may not run this command.
    #[error("command {command} is not available to {role}")]
    Forbidden { command: String, role: String },

    #[error("not logged in")]
    NotLoggedIn,

    /// Command line could not be parsed.
    #[error("usage: {0}")]
    Usage(String),

    /// Snapshot exists but is not valid JSON of the expected shape.
    #[error("corrupt snapshot {}: {source}", .path.display())]
    CorruptSnapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Snapshot could not be written.
    #[error("failed to save snapshot {}: {source}", .path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PosError {
    pub fn invalid_amount(amount: i64, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            amount,
            reason: reason.into(),
        }
    }

    /// Stable short code, used in journal events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::AuthFailed => "auth_failed",
            Self::DuplicateName(_) => "duplicate_name",
            Self::InvalidName => "invalid_name",
            Self::InvalidCredential => "invalid_credential",
            Self::NoOrder => "no_order",
            Self::Forbidden { .. } => "forbidden",
            Self::NotLoggedIn => "not_logged_in",
            Self::Usage(_) => "usage",
            Self::CorruptSnapshot { .. } => "corrupt_snapshot",
            Self::PersistenceFailure { .. } => "persistence_failure",
        }
    }
}

pub type PosResult<T> = std::result::Result<T, PosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            PosError::NotFound("Latte".to_string()).to_string(),
            "'Latte' not found"
        );
        let err = PosError::invalid_amount(-1, "must not be negative");
        assert_eq!(err.to_string(), "invalid amount -1: must not be negative");
        assert_eq!(err.code(), "invalid_amount");
    }

    #[test]
    fn test_persistence_failure_keeps_source() {
        use std::error::Error as _;
        let err = PosError::PersistenceFailure {
            path: PathBuf::from("data.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("data.json"));
        assert!(err.source().is_some());
    }
}
