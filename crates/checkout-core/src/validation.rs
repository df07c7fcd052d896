//! # Validation Module
//!
//! Input shape validation for the settlement & rewards engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (POS / booking UI)                                    │
//! │  ├── Basic format checks, immediate user feedback                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Cart shape, quantity/price bounds, totals reconciliation          │
//! │  └── Rejected BEFORE any persistence                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE / CHECK constraints                             │
//! │  └── Conditional updates enforce floors and ceilings                   │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::config::CheckoutConfig;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{CartItem, Coupon, DiscountType, ItemType, LoyaltyRedemption, TransactionDraft};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Cart Validation
// =============================================================================

/// Validates a whole cart before evaluation or settlement.
///
/// ## Rules
/// - Must not be empty, at most `MAX_CART_ITEMS` lines
/// - Every line passes [`validate_cart_item`]
pub fn validate_cart(cart: &[CartItem]) -> ValidationResult<()> {
    if cart.is_empty() {
        return Err(ValidationError::Required {
            field: "cart".to_string(),
        });
    }

    if cart.len() > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    for item in cart {
        validate_cart_item(item)?;
    }

    Ok(())
}

/// Validates a single cart line.
///
/// ## Rules
/// - Name present
/// - The id matching the line's type present (product id for product
///   lines, service id for service lines)
/// - Quantity in `[1, MAX_ITEM_QUANTITY]`
/// - Prices non-negative (zero allowed: free items)
pub fn validate_cart_item(item: &CartItem) -> ValidationResult<()> {
    if item.item_name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "item_name".to_string(),
        });
    }

    let (field, id) = match item.item_type {
        ItemType::Product => ("product_id", &item.product_id),
        ItemType::Service => ("service_id", &item.service_id),
    };
    if id.as_deref().map(str::trim).unwrap_or("").is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    validate_quantity(item.quantity)?;
    validate_price_cents(item.unit_price_cents)?;

    if let Some(booked) = item.booked_total_cents {
        if booked < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "booked_total".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Draft Validation
// =============================================================================

/// Validates a transaction draft before the settlement pipeline runs.
///
/// ## Rules
/// - All monetary fields non-negative
/// - `subtotal - discount - loyalty_discount + tax + tip == total`
/// - At least one tender, each with a positive amount and non-negative tip
/// - When points are redeemed, the draft's loyalty discount equals the
///   configured dollar value of those points
pub fn validate_draft(
    draft: &TransactionDraft,
    redemption: Option<&LoyaltyRedemption>,
    config: &CheckoutConfig,
) -> ValidationResult<()> {
    for (field, cents) in [
        ("subtotal", draft.subtotal_cents),
        ("tax", draft.tax_cents),
        ("tip", draft.tip_cents),
        ("discount", draft.discount_cents),
        ("loyalty_discount", draft.loyalty_discount_cents),
        ("total", draft.total_cents),
    ] {
        if cents < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: field.to_string(),
            });
        }
    }

    let expected = draft.expected_total_cents();
    if expected != draft.total_cents {
        return Err(ValidationError::TotalsMismatch {
            expected_cents: expected,
            actual_cents: draft.total_cents,
        });
    }

    if draft.payments.is_empty() {
        return Err(ValidationError::Required {
            field: "payments".to_string(),
        });
    }
    for payment in &draft.payments {
        validate_payment_amount(payment.amount_cents)?;
        if payment.tip_cents < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "payment tip".to_string(),
            });
        }
    }

    if let Some(redemption) = redemption {
        if redemption.points <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "redeemed points".to_string(),
            });
        }
        let value = config.redemption_value_cents(redemption.points);
        if value != draft.loyalty_discount_cents {
            return Err(ValidationError::LoyaltyDiscountMismatch {
                draft_cents: draft.loyalty_discount_cents,
                redemption_cents: value,
            });
        }
    } else if draft.loyalty_discount_cents != 0 {
        return Err(ValidationError::LoyaltyDiscountMismatch {
            draft_cents: draft.loyalty_discount_cents,
            redemption_cents: 0,
        });
    }

    Ok(())
}

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a payment amount in cents.
///
/// ## Rules
/// - Must be positive (> 0); zero or negative tenders are meaningless
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a coupon's reward configuration.
///
/// For admin tooling at authoring time: a coupon that passes here can
/// always be priced by the discount calculator, which itself never
/// throws.
///
/// ## Rules
/// - `percentage` values within 0..=10000 bps (0% to 100%)
/// - `flat` amounts non-negative
/// - `max_discount_cents` non-negative when set
/// - At most one target field set per reward
pub fn validate_coupon_rewards(coupon: &Coupon) -> CoreResult<()> {
    for reward in &coupon.rewards {
        let malformed = |reason: &str| CoreError::MalformedReward {
            code: coupon.code.clone(),
            reason: reason.to_string(),
        };

        match reward.discount_type {
            DiscountType::Percentage => {
                if !(0..=10_000).contains(&reward.discount_value) {
                    return Err(malformed("percentage value must be between 0 and 100%"));
                }
            }
            DiscountType::Flat => {
                if reward.discount_value < 0 {
                    return Err(malformed("flat amount must not be negative"));
                }
            }
            DiscountType::Free => {}
        }

        if reward.max_discount_cents.map(|c| c < 0).unwrap_or(false) {
            return Err(malformed("discount cap must not be negative"));
        }

        let targets = [
            reward.target_product_id.is_some(),
            reward.target_service_id.is_some(),
            reward.target_product_category_id.is_some(),
            reward.target_service_category_id.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if targets > 1 {
            return Err(malformed("a reward can carry at most one target"));
        }
    }

    Ok(())
}

/// Validates a coupon code's shape.
///
/// ## Rules
/// - Must not be empty, at most 50 characters
/// - Alphanumeric, hyphens, underscores only
pub fn validate_coupon_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a UUID string format.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
