//! # Error Types
//!
//! Domain-specific error types for checkout-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  checkout-core errors (this file)                                      │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  checkout-db errors (separate crate)                                   │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── SettlementError  - Pipeline failure naming the failed step        │
//! │                                                                         │
//! │  IMPORTANT: coupon ineligibility is NOT an error. The evaluators       │
//! │  return structured outcomes (passed / failed_conditions); only         │
//! │  malformed input reaches these types.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, code, field)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent domain logic failures in pure code. They should
/// be caught and translated to user-friendly messages by the caller.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A coupon carries a reward with inconsistent configuration.
    ///
    /// ## When This Occurs
    /// - A `percentage` reward with a value outside 0..=100%
    /// - A reward row carrying more than one target
    /// - A `flat` reward with a negative amount
    ///
    /// Checked by admin tooling at authoring time
    /// ([`validate_coupon_rewards`]); the discount calculator itself
    /// never throws.
    ///
    /// [`validate_coupon_rewards`]: crate::validation::validate_coupon_rewards
    #[error("Coupon {code} has a malformed reward: {reason}")]
    MalformedReward { code: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Rejected before any persistence happens.
#[derive(Debug, Error)]
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

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The draft's totals do not reconcile.
    ///
    /// ## When This Occurs
    /// `subtotal - discount - loyalty_discount + tax + tip` must equal
    /// `total`; a draft that fails this is rejected before the pipeline
    /// touches any row.
    #[error("Transaction totals do not reconcile: expected total {expected_cents} cents, got {actual_cents}")]
    TotalsMismatch {
        expected_cents: i64,
        actual_cents: i64,
    },

    /// The draft's loyalty discount disagrees with the redemption request.
    #[error("Loyalty discount {draft_cents} cents does not match redeemed point value {redemption_cents} cents")]
    LoyaltyDiscountMismatch {
        draft_cents: i64,
        redemption_cents: i64,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
