//! # checkout-core: Pure Business Logic for the Settlement & Rewards Engine
//!
//! This crate is the **heart** of the checkout engine. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Engine Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Callers (POS checkout, booking checkout)             │   │
//! │  │    assemble cart ──► evaluate coupon ──► settle transaction     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ checkout-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │  ┌───────────┐ ┌────────────┐ ┌───────────┐ ┌──────────────┐  │   │
//! │  │  │ targeting │ │ conditions │ │ discount  │ │  validation  │  │   │
//! │  │  │ who may   │ │ what cart  │ │ how much  │ │ input shape  │  │   │
//! │  │  │ use it    │ │ qualifies  │ │ comes off │ │    checks    │  │   │
//! │  │  └───────────┘ └────────────┘ └───────────┘ └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 checkout-db (Settlement Pipeline)               │   │
//! │  │        SQLite repositories + the atomic unit of work            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Coupon, CartItem, Transaction, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`config`] - Explicit engine configuration (never ambient globals)
//! - [`error`] - Domain error types
//! - [`validation`] - Input shape validation
//! - [`targeting`] - Coupon targeting evaluator (who may use a coupon)
//! - [`conditions`] - Coupon condition evaluator (what cart qualifies)
//! - [`discount`] - Discount calculator (how much comes off)
//! - [`evaluate`] - Targeting → Condition → Discount composition
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output; `now` is a parameter
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are in cents (i64)
//! 4. **Ineligibility is data, not an error**: the evaluators return
//!    structured outcomes; only malformed input produces an `Err`

// =============================================================================
// Module Declarations
// =============================================================================

pub mod conditions;
pub mod config;
pub mod discount;
pub mod error;
pub mod evaluate;
pub mod money;
pub mod targeting;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use checkout_core::Money` instead of
// `use checkout_core::money::Money`

pub use conditions::{evaluate_conditions, ConditionCheck, ConditionKind, ConditionOutcome};
pub use config::{CheckoutConfig, EnforcementMode};
pub use discount::calculate_discount;
pub use error::{CoreError, ValidationError};
pub use evaluate::{evaluate_coupon, pick_auto_apply, CouponEvaluation};
pub use money::Money;
pub use targeting::{evaluate_targeting, TargetingOutcome};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single cart line
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
