//! # Database Error Types
//!
//! Error types for database operations and the settlement pipeline.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SettlementError ← Tags the failed pipeline step                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller shows "checkout failed, please retry" (settlement failures     │
//! │  are rare and transient); conflicts are retryable                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context. The two
/// conflict variants are produced by the bounded conditional updates
/// themselves (zero rows affected), never by a separate read.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate coupon code or SKU
    /// - Any UNIQUE index violation
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The conditional stock decrement affected zero rows: honoring the
    /// decrement would take `quantity_on_hand` below zero.
    ///
    /// Retryable: a concurrent checkout may have consumed the stock, and
    /// the register can re-quote after a refresh.
    #[error("Insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: String, requested: i64 },

    /// The conditional use-count increment affected zero rows: the coupon
    /// is at its ceiling (or already redeemed, for single-use coupons).
    ///
    /// Retryable in the sense that checkout can be re-run without the
    /// coupon.
    #[error("Coupon {code} has no redemptions remaining")]
    CouponExhausted { code: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A string-list column held malformed JSON.
    #[error("Corrupt row data: {0}")]
    CorruptRow(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether this error is a resource conflict detected by a bounded
    /// conditional update. Conflicts abort the settlement but the caller
    /// may retry the checkout.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DbError::InsufficientStock { .. } | DbError::CouponExhausted { .. }
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
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

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
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

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

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

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::CorruptRow(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Settlement Error
// =============================================================================

/// The pipeline step that failed, for error reporting.
///
/// Deliberately coarse: the caller learns WHICH step failed, never which
/// concurrent transaction caused a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementStep {
    Header,
    Items,
    Payments,
    Inventory,
    Loyalty,
    Attribution,
    Commit,
}

impl std::fmt::Display for SettlementStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SettlementStep::Header => "header",
            SettlementStep::Items => "items",
            SettlementStep::Payments => "payments",
            SettlementStep::Inventory => "inventory",
            SettlementStep::Loyalty => "loyalty",
            SettlementStep::Attribution => "attribution",
            SettlementStep::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// A settlement failure: the single error the pipeline propagates.
///
/// Any step's failure rolls back every prior step; nothing earlier than
/// the header insert is ever a partial success.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The draft or cart was malformed; nothing was persisted.
    #[error("settlement rejected during validation: {0}")]
    Invalid(#[from] checkout_core::ValidationError),

    /// A pipeline step failed; the whole settlement rolled back.
    #[error("settlement failed during {step}: {source}")]
    Step {
        step: SettlementStep,
        #[source]
        source: DbError,
    },
}

impl SettlementError {
    /// Tags a DbError with the step it occurred in.
    pub fn at(step: SettlementStep) -> impl FnOnce(DbError) -> SettlementError {
        move |source| SettlementError::Step { step, source }
    }

    /// Whether the underlying failure is a retryable resource conflict.
    pub fn is_conflict(&self) -> bool {
        match self {
            SettlementError::Invalid(_) => false,
            SettlementError::Step { source, .. } => source.is_conflict(),
        }
    }
}

/// Result type for settlement operations.
pub type SettlementResult<T> = Result<T, SettlementError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        let stock = DbError::InsufficientStock {
            product_id: "p1".to_string(),
            requested: 2,
        };
        assert!(stock.is_conflict());

        let exhausted = DbError::CouponExhausted {
            code: "SAVE10".to_string(),
        };
        assert!(exhausted.is_conflict());

        let not_found = DbError::not_found("Coupon", "c1");
        assert!(!not_found.is_conflict());
    }

    #[test]
    fn test_settlement_error_names_step() {
        let err = SettlementError::Step {
            step: SettlementStep::Inventory,
            source: DbError::InsufficientStock {
                product_id: "p1".to_string(),
                requested: 3,
            },
        };
        assert!(err.to_string().contains("inventory"));
        assert!(err.is_conflict());
    }
}
