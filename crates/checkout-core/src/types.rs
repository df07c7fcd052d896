//! # Domain Types
//!
//! Core domain types used throughout the settlement & rewards engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Coupon      │   │   Transaction   │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  code           │1:N│  totals (cents) │   │  tags           │       │
//! │  │  targeting      ├──►│  couponId?      │   │  visit_count    │       │
//! │  │  conditions     │   │  loyalty fields │   │  points balance │       │
//! │  │  [CouponReward] │   │  [Item][Payment]│   │  [LedgerEntry]  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  CartItem is ephemeral: it exists only for the duration of one         │
//! │  checkout computation and is discarded after settlement.               │
//! │                                                                         │
//! │  Transaction / TransactionItem / Payment / LoyaltyLedgerEntry are      │
//! │  created exactly once and never mutated (corrections are new ledger    │
//! │  rows, not edits).                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle status of a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    /// Being authored, not yet redeemable.
    Draft,
    /// Live and redeemable.
    Active,
    /// Past its expiry date.
    Expired,
    /// Turned off by an operator.
    Disabled,
}

/// How a coupon's `customer_tags` list is matched against a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TagMatchMode {
    /// At least one listed tag must be present on the customer.
    Any,
    /// Every listed tag must be present on the customer.
    All,
}

/// How a coupon's configured conditions are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ConditionLogic {
    /// All configured conditions must be met.
    And,
    /// At least one configured condition must be met.
    Or,
}

/// What a reward's discount is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum RewardScope {
    /// The whole order subtotal.
    Order,
    /// Matching product lines.
    Product,
    /// Matching service lines.
    Service,
}

/// The kind of discount a reward applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `discount_value` is basis points of the applicable base (1000 = 10%),
    /// optionally capped by `max_discount_cents`.
    Percentage,
    /// `discount_value` is a fixed amount in cents, never exceeding the base.
    Flat,
    /// The full applicable base comes off.
    Free,
}

/// Whether a cart line is a retail product or a booked service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Product,
    Service,
}

/// Loyalty ledger entry kind. The ledger is append-only and is the source
/// of truth for the cached balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    /// Points accrued from a settled transaction.
    Earned,
    /// Points spent against a transaction's total.
    Redeemed,
    /// Manual back-office correction.
    Adjusted,
    /// Points removed by an expiry sweep.
    Expired,
}

/// Payment tender type.
///
/// Card tenders have a processing fee removed from the tip before staff
/// payout; see the settlement pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    /// Gift cards, account credit, anything that is not cash or card.
    Other,
}

/// Status of a persisted transaction. The pipeline only ever writes
/// `Completed`; `Voided` exists for back-office corrections performed by
/// admin tooling outside this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Voided,
}

// =============================================================================
// Coupon
// =============================================================================

/// A coupon: targeting rules, usage conditions, usage bookkeeping, and one
/// or more reward rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Redemption code - business identifier, unique.
    pub code: String,

    pub status: CouponStatus,

    /// Eligible coupons with this flag set are attached automatically at
    /// checkout when no code was entered (best discount wins).
    pub auto_apply: bool,

    /// Exact-match customer restriction. Set ⇒ only that customer may use
    /// the coupon.
    pub customer_id: Option<String>,

    /// Tag restriction, combined per `tag_match_mode`. Empty ⇒ no tag
    /// restriction.
    pub customer_tags: Vec<String>,

    pub tag_match_mode: TagMatchMode,

    /// Customer class restriction (classes are admin-defined strings).
    /// Enforcement is soft or hard per the caller-supplied mode: class
    /// targeting is a merchandising hint, identity/tag targeting is a hard
    /// eligibility gate.
    pub target_customer_type: Option<String>,

    pub condition_logic: ConditionLogic,

    /// Cart must contain at least one of these products.
    pub requires_product_ids: Vec<String>,

    /// Cart must contain at least one of these services.
    pub requires_service_ids: Vec<String>,

    /// Cart must contain a product in one of these categories.
    pub requires_product_category_ids: Vec<String>,

    /// Cart must contain a service in one of these categories.
    pub requires_service_category_ids: Vec<String>,

    /// Minimum order subtotal, in cents.
    pub min_purchase_cents: Option<i64>,

    /// Customer must have visited at most this many times.
    pub max_customer_visits: Option<i64>,

    /// One redemption total, regardless of `max_uses`.
    pub is_single_use: bool,

    /// Times this coupon has been redeemed. Incremented atomically by the
    /// settlement pipeline, never by the evaluators.
    pub use_count: i64,

    /// Redemption ceiling. None ⇒ unlimited.
    pub max_uses: Option<i64>,

    pub expires_at: Option<DateTime<Utc>>,

    /// Marketing campaign credited when this coupon is redeemed.
    pub campaign_id: Option<String>,

    /// Reward rules; their contributions are summed.
    pub rewards: Vec<CouponReward>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Whether the coupon has expired relative to the supplied instant.
    ///
    /// `now` is a parameter so evaluation stays pure.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    /// Whether every allowed redemption has been consumed.
    ///
    /// A single-use coupon is exhausted after one redemption even when
    /// `max_uses` is unset.
    pub fn is_exhausted(&self) -> bool {
        if self.is_single_use && self.use_count >= 1 {
            return true;
        }
        match self.max_uses {
            Some(max) => self.use_count >= max,
            None => false,
        }
    }

    /// Whether any usage condition is configured at all.
    ///
    /// Zero configured conditions ⇒ the coupon passes unconditionally.
    pub fn has_conditions(&self) -> bool {
        !self.requires_product_ids.is_empty()
            || !self.requires_service_ids.is_empty()
            || !self.requires_product_category_ids.is_empty()
            || !self.requires_service_category_ids.is_empty()
            || self.min_purchase_cents.is_some()
            || self.max_customer_visits.is_some()
    }
}

// =============================================================================
// Coupon Reward
// =============================================================================

/// One discount rule attached to a coupon.
///
/// At most one of the four target fields is set. None set ⇒ the reward
/// applies to all items of its scope (or the whole order for
/// `RewardScope::Order`, which ignores targets).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CouponReward {
    pub id: String,
    pub coupon_id: String,
    pub applies_to: RewardScope,
    pub discount_type: DiscountType,
    /// Basis points for `Percentage` (1000 = 10%), cents for `Flat`,
    /// ignored for `Free`.
    pub discount_value: i64,
    /// Cap on a percentage reward's contribution, in cents.
    pub max_discount_cents: Option<i64>,
    pub target_product_id: Option<String>,
    pub target_service_id: Option<String>,
    pub target_product_category_id: Option<String>,
    pub target_service_category_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CouponReward {
    /// The target id for this reward's scope, if any.
    pub fn target_id(&self) -> Option<&str> {
        match self.applies_to {
            RewardScope::Order => None,
            RewardScope::Product => self.target_product_id.as_deref(),
            RewardScope::Service => self.target_service_id.as_deref(),
        }
    }

    /// The target category for this reward's scope, if any.
    pub fn target_category_id(&self) -> Option<&str> {
        match self.applies_to {
            RewardScope::Order => None,
            RewardScope::Product => self.target_product_category_id.as_deref(),
            RewardScope::Service => self.target_service_category_id.as_deref(),
        }
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// A line in the checkout cart.
///
/// Ephemeral: constructed per checkout request from catalog data and
/// discarded after settlement. Prices are frozen at assembly time
/// (snapshot pattern), so a concurrent catalog edit cannot change a cart
/// mid-checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub item_type: ItemType,

    /// Set when `item_type` is `Product`.
    pub product_id: Option<String>,

    /// Set when `item_type` is `Service`.
    pub service_id: Option<String>,

    /// Catalog category of the underlying product/service.
    pub category_id: Option<String>,

    /// Display name at time of assembly (frozen).
    pub item_name: String,

    /// Unit price in cents at time of assembly (frozen).
    pub unit_price_cents: i64,

    pub quantity: i64,

    /// For service lines booked as a package: the booked total for the
    /// whole line. When set, it is the line total and the recorded
    /// per-unit price is `booked_total / quantity`.
    pub booked_total_cents: Option<i64>,

    /// Tax flag from the catalog (carried onto the transaction item row).
    pub taxable: bool,
}

impl CartItem {
    /// The line total in cents: the booked total when present, otherwise
    /// `unit_price * quantity`.
    pub fn line_total_cents(&self) -> i64 {
        self.booked_total_cents
            .unwrap_or(self.unit_price_cents * self.quantity)
    }

    /// The per-unit price recorded on the transaction item row.
    ///
    /// For a multi-quantity service line booked as a package this is the
    /// booked total divided by quantity; otherwise the frozen unit price.
    pub fn per_unit_cents(&self) -> i64 {
        match self.booked_total_cents {
            Some(total) if self.quantity > 0 => total / self.quantity,
            _ => self.unit_price_cents,
        }
    }

    /// The catalog id for this line's type (product id or service id).
    pub fn catalog_id(&self) -> Option<&str> {
        match self.item_type {
            ItemType::Product => self.product_id.as_deref(),
            ItemType::Service => self.service_id.as_deref(),
        }
    }

    /// Line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents())
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer with lifetime stats and the cached loyalty balance.
///
/// `loyalty_points_balance` is a derived cache of the ledger and must
/// always equal the latest ledger snapshot for the customer. It is
/// mutated once per completed transaction and never goes negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub customer_type: Option<String>,
    pub visit_count: i64,
    pub lifetime_spend_cents: i64,
    pub loyalty_points_balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Whether the customer carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

// =============================================================================
// Catalog: Product & Service
// =============================================================================

/// A retail product with tracked inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    /// Display name shown on receipts.
    pub name: String,

    pub category_id: Option<String>,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Whether sales tax applies to this product.
    pub taxable: bool,

    /// Whether purchases of this product accrue loyalty points.
    /// Convenience items (e.g. bottled water) are typically excluded.
    pub loyalty_eligible: bool,

    /// Whether to track inventory for this product. Untracked products
    /// skip the settlement pipeline's stock decrement.
    pub track_inventory: bool,

    /// Current stock level. Never negative; the settlement pipeline
    /// enforces the floor with a conditional decrement.
    pub quantity_on_hand: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether the requested quantity can currently be fulfilled.
    ///
    /// Advisory only: the settlement pipeline's conditional decrement is
    /// the authoritative check under concurrency.
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        !self.track_inventory || self.quantity_on_hand >= quantity
    }
}

/// A bookable service (haircut, detail, repair slot, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Service {
    pub id: String,
    pub name: String,
    pub category_id: Option<String>,
    pub price_cents: i64,
    pub taxable: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Transaction
// =============================================================================

/// A settled transaction header. Immutable once created; the only write
/// after insert is `loyalty_points_earned`, set by the loyalty step of the
/// same database transaction that created the header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: String,
    pub customer_id: Option<String>,
    pub coupon_id: Option<String>,
    pub status: TransactionStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub tip_cents: i64,
    pub discount_cents: i64,
    pub loyalty_discount_cents: i64,
    pub total_cents: i64,
    /// Primary tender; per-tender detail lives on the payment rows.
    pub payment_method: PaymentMethod,
    pub loyalty_points_earned: i64,
    pub loyalty_points_redeemed: i64,
    pub created_at: DateTime<Utc>,
}

/// A line item on a settled transaction.
/// Uses the snapshot pattern to freeze catalog data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub item_type: ItemType,
    pub product_id: Option<String>,
    pub service_id: Option<String>,
    pub category_id: Option<String>,
    /// Item name at time of sale (frozen).
    pub name_snapshot: String,
    /// Per-unit price in cents; for multi-quantity service lines this is
    /// the booked total divided by quantity.
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
    pub taxable: bool,
    pub created_at: DateTime<Utc>,
}

/// A payment towards a transaction.
/// A transaction can carry multiple payments for split tender scenarios.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub transaction_id: String,
    pub method: PaymentMethod,
    /// Amount paid in cents (excluding tip).
    pub amount_cents: i64,
    /// Gross tip on this tender.
    pub tip_cents: i64,
    /// Tip credited to staff payout: card tenders have the processing fee
    /// removed, other tenders pass through untouched.
    pub net_tip_cents: i64,
    /// External reference (card auth code, etc.).
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Loyalty Ledger
// =============================================================================

/// One append-only loyalty ledger row.
///
/// ## Audit Invariant
/// `points_balance` equals the customer's balance immediately after this
/// row's change. A reconciliation job walks the ledger and checks that
/// each row's balance is the previous balance plus `points_change`, and
/// that the customer's cached balance equals the last row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LoyaltyLedgerEntry {
    pub id: String,
    pub customer_id: String,
    pub transaction_id: Option<String>,
    pub action: LedgerAction,
    /// Signed change (+earned, -redeemed).
    pub points_change: i64,
    /// Balance snapshot after applying `points_change`.
    pub points_balance: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Campaign
// =============================================================================

/// A marketing campaign credited once per transaction that used a coupon
/// linked to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub redeemed_count: i64,
    pub revenue_attributed_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Settlement Inputs
// =============================================================================

/// Caller-assembled totals and tenders for one settlement.
///
/// The pipeline echoes these onto the header; it does not recompute them.
/// Validation rejects drafts whose totals do not reconcile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub customer_id: Option<String>,
    pub coupon_id: Option<String>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub tip_cents: i64,
    /// Coupon discount, from the discount calculator.
    pub discount_cents: i64,
    /// Dollar value of redeemed loyalty points.
    pub loyalty_discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    /// One or more tenders. Their amounts are echoed as payment rows.
    pub payments: Vec<PaymentDraft>,
}

impl TransactionDraft {
    /// The total the supplied parts reconcile to.
    pub fn expected_total_cents(&self) -> i64 {
        self.subtotal_cents - self.discount_cents - self.loyalty_discount_cents
            + self.tax_cents
            + self.tip_cents
    }
}

/// One tender within a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDraft {
    pub method: PaymentMethod,
    pub amount_cents: i64,
    /// Gross tip carried by this tender.
    pub tip_cents: i64,
    pub reference: Option<String>,
}

/// A request to spend loyalty points against a transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoyaltyRedemption {
    /// Points the customer asked to spend. The balance is clamped at
    /// zero: redeeming more than the balance holds spends only what is
    /// there.
    pub points: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
