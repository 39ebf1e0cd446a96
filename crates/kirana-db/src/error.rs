//! # Database & Ledger Error Types
//!
//! Two layers of errors live here:
//!
//! - [`DbError`] wraps `sqlx` failures and categorises them.
//! - [`LedgerError`] is what every public operation of this crate returns:
//!   a domain failure from kirana-core or a storage failure, each with a
//!   stable [`ErrorKind`] the caller can branch on.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError (validation, stock)       │
//! │       │                                 │                               │
//! │       ▼                                 │                               │
//! │  DbError ← categorised, Busy split out  │                               │
//! │       │                                 │                               │
//! │       └──────────────┬──────────────────┘                               │
//! │                      ▼                                                  │
//! │  LedgerError ── kind() ──► InvalidRequest | NotFound | InsufficientStock│
//! │                            Conflict | Busy | Internal                   │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │  API layer maps ErrorKind to a status code; retries only on Busy       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use kirana_core::CoreError;
use serde::Serialize;
use thiserror::Error;

// =============================================================================
// DbError
// =============================================================================

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist, or exists in another tenant
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a SKU that already exists in the tenant
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Deleting a product that a bill item or movement references
    /// - Referencing a row that does not exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The write lock could not be taken within the configured wait.
    ///
    /// ## When This Occurs
    /// - SQLITE_BUSY / SQLITE_LOCKED after `busy_timeout` expired
    /// - No pooled connection became free within `connect_timeout`
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Pool already closed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True for lock contention.
    pub fn is_busy(&self) -> bool {
        matches!(self, DbError::Busy(_))
    }
}

/// SQLite primary and extended result codes that mean "someone else holds
/// the lock": BUSY, BUSY_RECOVERY, BUSY_SNAPSHOT, BUSY_TIMEOUT, LOCKED,
/// LOCKED_SHAREDCACHE.
const BUSY_CODES: &[&str] = &["5", "261", "517", "773", "6", "262"];

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → BUSY/LOCKED codes → DbError::Busy
///                               otherwise analyse message for constraint
/// sqlx::Error::PoolTimedOut   → DbError::Busy
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let busy_code = db_err
                    .code()
                    .is_some_and(|code| BUSY_CODES.contains(&code.as_ref()));

                if busy_code || msg.contains("database is locked") {
                    DbError::Busy(msg.to_string())
                } else if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    // "products.tenant_id, products.sku" → "sku"
                    let field = columns
                        .rsplit(", ")
                        .next()
                        .and_then(|c| c.rsplit('.').next())
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => {
                DbError::Busy("timed out waiting for a pooled connection".to_string())
            }

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// LedgerError
// =============================================================================

/// Stable error categories for callers.
///
/// ## Usage in the API layer
/// ```text
/// InvalidRequest    → 400, caller bug, never retried
/// NotFound          → 404, unknown or cross-tenant reference
/// InsufficientStock → 409, shown to the cashier
/// Conflict          → 409, e.g. duplicate SKU, product still referenced
/// Busy              → 503, retry the whole operation from scratch
/// Internal          → 500, logged and surfaced
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    InsufficientStock,
    Conflict,
    Busy,
    Internal,
}

/// Error returned by every public operation in this crate.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Business rule violation from kirana-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure.
    #[error(transparent)]
    Db(DbError),
}

impl LedgerError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Core(err) => match err {
                CoreError::InvalidRequest { .. }
                | CoreError::InvalidLine { .. }
                | CoreError::Validation(_) => ErrorKind::InvalidRequest,
                CoreError::NotFound { .. } => ErrorKind::NotFound,
                CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            },
            LedgerError::Db(err) => match err {
                DbError::NotFound { .. } => ErrorKind::NotFound,
                DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                    ErrorKind::Conflict
                }
                DbError::Busy(_) => ErrorKind::Busy,
                DbError::ConnectionFailed(_)
                | DbError::MigrationFailed(_)
                | DbError::QueryFailed(_)
                | DbError::TransactionFailed(_)
                | DbError::Internal(_) => ErrorKind::Internal,
            },
        }
    }

    /// True only for lock contention; the caller may rerun the whole
    /// operation.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Busy
    }

    /// Shorthand for a NotFound domain error.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        LedgerError::Core(CoreError::not_found(entity, id))
    }
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            // Lift storage NotFound into the domain error so callers see one shape.
            DbError::NotFound { entity, id } => LedgerError::Core(CoreError::NotFound { entity, id }),
            other => LedgerError::Db(other),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

impl From<kirana_core::ValidationError> for LedgerError {
    fn from(err: kirana_core::ValidationError) -> Self {
        LedgerError::Core(err.into())
    }
}

/// Result type for public operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
