//! Error surface for pipeline and workspace operations.
//!
//! File plumbing stays on `anyhow` and is wrapped as [`PlannerError::Storage`];
//! everything a caller can act on carries a reason plus a suggested next command.

use thiserror::Error;

pub type PlannerResult<T> = std::result::Result<T, PlannerError>;

#[derive(Debug, Error)]
pub enum PlannerError {
    /// Templates, pools or rule data are missing or ambiguous.
    #[error("Configuration error: {reason}")]
    Config {
        reason: String,
        suggestion: Option<String>,
    },

    /// The request refers to something that does not exist or conflicts with stored state.
    #[error("Invalid request: {reason}")]
    Validation {
        reason: String,
        suggestion: Option<String>,
    },

    /// Destructive operation attempted without explicit confirmation.
    #[error("{operation} is destructive and requires confirmation")]
    ConfirmationRequired { operation: String },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl PlannerError {
    pub fn config(reason: impl Into<String>) -> Self {
        PlannerError::Config {
            reason: reason.into(),
            suggestion: None,
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        PlannerError::Validation {
            reason: reason.into(),
            suggestion: None,
        }
    }

    pub fn confirmation(operation: impl Into<String>) -> Self {
        PlannerError::ConfirmationRequired {
            operation: operation.into(),
        }
    }

    /// Attaches a next-step hint. Storage and confirmation errors keep their own.
    pub fn with_suggestion(self, hint: impl Into<String>) -> Self {
        match self {
            PlannerError::Config { reason, .. } => PlannerError::Config {
                reason,
                suggestion: Some(hint.into()),
            },
            PlannerError::Validation { reason, .. } => PlannerError::Validation {
                reason,
                suggestion: Some(hint.into()),
            },
            other => other,
        }
    }

    pub fn suggestion(&self) -> Option<String> {
        match self {
            PlannerError::Config { suggestion, .. } | PlannerError::Validation { suggestion, .. } => {
                suggestion.clone()
            }
            PlannerError::ConfirmationRequired { operation } => {
                Some(format!("repeat `{operation}` with confirmation"))
            }
            PlannerError::Storage(_) => None,
        }
    }

    /// Reason followed by the suggestion, if any, for display in a CLI.
    pub fn describe(&self) -> String {
        match self.suggestion() {
            Some(hint) => format!("{self} (try: {hint})"),
            None => self.to_string(),
        }
    }
}

/// Bails out of a `PlannerResult` function with a validation error.
macro_rules! invalid {
    ($($arg:tt)*) => {
        return Err($crate::error::PlannerError::validation(format!($($arg)*)))
    };
}

pub(crate) use invalid;
