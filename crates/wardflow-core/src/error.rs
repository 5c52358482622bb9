use thiserror::Error;

/// Core error taxonomy for Wardflow operations.
///
/// Every failure a caller can observe is one of these four variants; lower
/// layers never collapse them into a generic failure and the coordinator
/// surfaces them unchanged.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl CoreError {
    /// Create a new NotFound error for a referenced entity.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create a new Conflict error (uniqueness/exclusivity invariant violated).
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a new InvalidState error (operation not permitted in the
    /// entity's current lifecycle state).
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a new InvalidInput error (malformed amount/quantity/reference).
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Stable API-facing error code for this error.
    ///
    /// The UI layer maps these to user-visible messages ("try again, the
    /// resource just became unavailable" for `conflict`, and so on); the
    /// codes never change once published.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::InvalidState { .. } => "invalid_state",
            Self::InvalidInput { .. } => "invalid_input",
        }
    }

    /// Whether a retry of the same call could plausibly succeed.
    ///
    /// Retrying is always the caller's decision; the core never retries a
    /// non-idempotent transition on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Get the error category for logging/monitoring.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::InvalidState { .. } => ErrorCategory::Lifecycle,
            Self::InvalidInput { .. } => ErrorCategory::Validation,
        }
    }
}

/// Error categories for monitoring and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Conflict,
    Lifecycle,
    Validation,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Lifecycle => write!(f, "lifecycle"),
            Self::Validation => write!(f, "validation"),
        }
    }
}

/// Convenience result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = CoreError::not_found("Bed", "bed-7");
        assert_eq!(err.to_string(), "Bed not found: bed-7");
        assert_eq!(err.code(), "not_found");
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_conflict_error() {
        let err = CoreError::conflict("bed bed-7 is already occupied");
        assert_eq!(err.to_string(), "Conflict: bed bed-7 is already occupied");
        assert_eq!(err.code(), "conflict");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_invalid_state_error() {
        let err = CoreError::invalid_state("episode is already discharged");
        assert_eq!(err.code(), "invalid_state");
        assert_eq!(err.category(), ErrorCategory::Lifecycle);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_invalid_input_error() {
        let err = CoreError::invalid_input("quantity must be at least 1");
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_error_codes_are_stable() {
        // These strings are part of the API contract with UI layers.
        assert_eq!(CoreError::not_found("Ward", "w").code(), "not_found");
        assert_eq!(CoreError::conflict("c").code(), "conflict");
        assert_eq!(CoreError::invalid_state("s").code(), "invalid_state");
        assert_eq!(CoreError::invalid_input("i").code(), "invalid_input");
    }

    #[test]
    fn test_error_categories_display() {
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
        assert_eq!(ErrorCategory::Conflict.to_string(), "conflict");
        assert_eq!(ErrorCategory::Lifecycle.to_string(), "lifecycle");
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
    }

    #[test]
    fn test_result_type_usage() {
        fn succeeds() -> Result<u32> {
            Ok(1)
        }

        fn fails() -> Result<u32> {
            Err(CoreError::conflict("taken"))
        }

        assert!(succeeds().is_ok());
        assert!(fails().is_err());
    }
}
