//! Oracle access errors.

use crate::error::{ErrorSeverity, GameError};

/// Errors that occur when looking up content through the environment.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OracleError {
    #[error("PowerOracle not available")]
    PowersNotAvailable,

    #[error("power '{0}' not found")]
    PowerNotFound(String),
}

impl GameError for OracleError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::PowersNotAvailable => ErrorSeverity::Fatal,
            Self::PowerNotFound(_) => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::PowersNotAvailable => "ORACLE_POWERS_NOT_AVAILABLE",
            Self::PowerNotFound(_) => "ORACLE_POWER_NOT_FOUND",
        }
    }
}
