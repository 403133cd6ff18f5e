//! Unified error hierarchy for barplan.
//!
//! The engine's pure functions (normalization, state updates) never fail;
//! they saturate or clamp. Everything fallible (parsing, storage, missing
//! prerequisites) funnels through [`BarplanError`].

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all barplan operations
#[derive(Debug, Error)]
pub enum BarplanError {
    /// Malformed user input: set notation, dates, out-of-range values
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Required state is absent (no profile, no history, no baseline)
    #[error("Missing state: {0}")]
    MissingState(String),

    /// Stored data contradicts itself or the exercise registry
    #[error("Inconsistent data: {0}")]
    Inconsistent(String),

    /// Config overlay failed to load; bundled defaults are in effect
    #[error("Config degraded: {0}")]
    ConfigDegraded(String),

    /// History file not found at the expected path
    #[error("History file not found: {path}")]
    HistoryNotFound { path: PathBuf },

    /// Profile file not found at the expected path
    #[error("Profile not found: {path}")]
    ProfileNotFound { path: PathBuf },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for barplan operations
pub type Result<T> = std::result::Result<T, BarplanError>;

impl BarplanError {
    /// User-facing message with a recovery hint where one exists
    pub fn user_message(&self) -> String {
        match self {
            BarplanError::HistoryNotFound { path } => {
                format!(
                    "History file not found: {}. Run 'init' first to create profile and history.",
                    path.display()
                )
            }
            BarplanError::ProfileNotFound { path } => {
                format!("Profile not found: {}. Run 'init' first.", path.display())
            }
            BarplanError::MissingState(msg) => {
                format!("{msg}. Run 'init' or log a TEST session first.")
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_not_found_hint() {
        let err = BarplanError::HistoryNotFound {
            path: PathBuf::from("/tmp/x/pull_up_history.jsonl"),
        };
        assert!(err.user_message().contains("Run 'init'"));
    }

    #[test]
    fn test_invalid_input_display() {
        let err = BarplanError::InvalidInput("days-per-week must be 1..5".to_string());
        assert!(err.to_string().contains("days-per-week"));
    }
}
