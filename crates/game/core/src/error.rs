//! Common error infrastructure for skirmish-core.
//!
//! Domain-specific errors (`MoveError`, `TargetingError`, `PowerError`,
//! `ActionUnavailable`) live next to the operations that produce them. They
//! are never raised for expected domain conditions: operations stay total and
//! hand the error back as a value (or narrate it in the log) while leaving the
//! state untouched.
//!
//! # Design Principles
//!
//! - **Type Safety**: each operation family has its own error enum
//! - **Severity Classification**: errors are categorized for recovery strategies
//! - **Deterministic**: errors carry no wall-clock or host data

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Can succeed later or with a different choice.
    ///
    /// Examples: no action slot left, target out of range
    Recoverable,

    /// Invalid input that should not be retried unchanged.
    ///
    /// Examples: unknown actor, malformed template
    Validation,

    /// Unexpected state inconsistency. Indicates a bug.
    ///
    /// Examples: a patch referencing a removed actor
    Internal,

    /// State corrupted, the encounter cannot continue.
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all skirmish-core errors.
///
/// # Implementation Guidelines
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    /// Stable identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
