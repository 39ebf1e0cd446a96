//! # Error Types
//!
//! Domain-specific error types for kirana-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CoreError (business rule violations)                                  │
//! │  ├── InvalidRequest       ← malformed request as a whole               │
//! │  ├── InvalidLine          ← one bill line is malformed                 │
//! │  ├── NotFound             ← unknown or cross-tenant reference          │
//! │  ├── InsufficientStock    ← a line cannot be fulfilled                 │
//! │  └── Validation(..)       ← field-level input checks                   │
//! │                                                                         │
//! │  ValidationError (field-level input checks)                            │
//! │  ├── Required / TooLong / InvalidFormat                                │
//! │  └── MustBePositive / OutOfRange / NotAllowed                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant names the offending entity or line so the caller can show
//! an actionable message.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The request as a whole is malformed (e.g. a bill with no lines).
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// A single line of a sale request is malformed.
    ///
    /// `line` is the zero-based position in the request.
    #[error("Invalid line {line}: {reason}")]
    InvalidLine { line: usize, reason: String },

    /// Entity does not exist in the caller's tenant.
    ///
    /// ## When This Occurs
    /// - ID doesn't exist
    /// - ID exists but belongs to another tenant (indistinguishable on purpose)
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A line asks for more units than are on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Bill line 2: SUGAR-1KG × 5
    ///      │
    ///      ▼
    /// Locked row: current_stock = 3
    ///      │
    ///      ▼
    /// InsufficientStock { line: 2, sku: "SUGAR-1KG", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Till shows: "Only 3 SUGAR-1KG in stock"
    /// ```
    #[error(
        "Insufficient stock for {sku} (line {line}): available {available}, requested {requested}"
    )]
    InsufficientStock {
        line: usize,
        product_id: i64,
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates an InvalidRequest error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        CoreError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Creates an InvalidLine error.
    pub fn invalid_line(line: usize, reason: impl Into<String>) -> Self {
        CoreError::InvalidLine {
            line,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            line: 1,
            product_id: 7,
            sku: "SUGAR-1KG".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for SUGAR-1KG (line 1): available 3, requested 5"
        );

        assert_eq!(
            CoreError::not_found("Product", 42).to_string(),
            "Product not found: 42"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "amount".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
