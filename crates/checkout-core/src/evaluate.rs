//! # Coupon Evaluation
//!
//! Composes the three pure evaluators into the single call a checkout
//! screen makes: coupon-level gates → Targeting → Condition → Discount.
//!
//! ## Control Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  evaluate_coupon(coupon, customer, cart, subtotal, now, config)         │
//! │       │                                                                 │
//! │       ├── status != active ──────────► not eligible                     │
//! │       ├── expired at `now` ──────────► not eligible                     │
//! │       ├── use ceiling reached ───────► not eligible                     │
//! │       │                                                                 │
//! │       ├── Targeting Evaluator ── fail ► not eligible                    │
//! │       │        └── soft class warning accumulates                       │
//! │       ├── Condition Evaluator ── fail ► not eligible + failed/missing   │
//! │       │                                                                 │
//! │       └── Discount Calculator ───────► eligible, discount amount        │
//! │                                                                         │
//! │  Ineligibility is business data, never an error: checkout proceeds      │
//! │  without the coupon and shows the failed conditions.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conditions::evaluate_conditions;
use crate::config::CheckoutConfig;
use crate::discount::calculate_discount;
use crate::money::Money;
use crate::targeting::evaluate_targeting;
use crate::types::{CartItem, Coupon, CouponStatus, Customer};

// =============================================================================
// Result
// =============================================================================

/// The structured outcome of evaluating one coupon against a checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponEvaluation {
    pub eligible: bool,
    /// Validated discount in cents; zero when not eligible.
    pub discount_cents: i64,
    /// Soft-enforcement warnings (class targeting) the caller may show
    /// without blocking checkout.
    pub warnings: Vec<String>,
    /// Why the coupon did not apply, for messaging.
    pub failed_conditions: Vec<String>,
    /// Machine-readable tags suggesting what to add to the cart.
    pub missing_items: Vec<String>,
}

impl CouponEvaluation {
    fn ineligible(reason: String) -> Self {
        CouponEvaluation {
            eligible: false,
            discount_cents: 0,
            warnings: Vec::new(),
            failed_conditions: vec![reason],
            missing_items: Vec::new(),
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluates a coupon against a checkout: gates, targeting, conditions,
/// discount.
///
/// Pure: `now` is supplied by the caller, and `use_count` is whatever the
/// caller read. The settlement pipeline re-checks the use ceiling
/// atomically at commit time, so a stale read here can never over-redeem.
pub fn evaluate_coupon(
    coupon: &Coupon,
    customer: Option<&Customer>,
    cart: &[CartItem],
    subtotal: Money,
    now: DateTime<Utc>,
    config: &CheckoutConfig,
) -> CouponEvaluation {
    if coupon.status != CouponStatus::Active {
        return CouponEvaluation::ineligible(format!("Coupon {} is not active", coupon.code));
    }

    if coupon.is_expired(now) {
        return CouponEvaluation::ineligible(format!("Coupon {} has expired", coupon.code));
    }

    if coupon.is_exhausted() {
        return CouponEvaluation::ineligible(format!(
            "Coupon {} has reached its usage limit",
            coupon.code
        ));
    }

    let targeting = evaluate_targeting(coupon, customer, config.enforcement);
    if !targeting.passed {
        return CouponEvaluation::ineligible(format!(
            "Coupon {} is not available for this customer",
            coupon.code
        ));
    }

    let conditions = evaluate_conditions(coupon, cart, subtotal, customer);
    if !conditions.passed {
        return CouponEvaluation {
            eligible: false,
            discount_cents: 0,
            warnings: targeting.warning.into_iter().collect(),
            failed_conditions: conditions.failed_conditions,
            missing_items: conditions.missing_items,
        };
    }

    let discount = calculate_discount(&coupon.rewards, cart, subtotal);

    CouponEvaluation {
        eligible: true,
        discount_cents: discount.cents(),
        warnings: targeting.warning.into_iter().collect(),
        failed_conditions: Vec::new(),
        missing_items: Vec::new(),
    }
}

/// Picks the best auto-apply coupon for a checkout.
///
/// Evaluates every `auto_apply` candidate and returns the eligible one
/// with the largest discount (ties broken by coupon code for
/// determinism), together with its evaluation.
pub fn pick_auto_apply<'a>(
    candidates: &'a [Coupon],
    customer: Option<&Customer>,
    cart: &[CartItem],
    subtotal: Money,
    now: DateTime<Utc>,
    config: &CheckoutConfig,
) -> Option<(&'a Coupon, CouponEvaluation)> {
    candidates
        .iter()
        .filter(|c| c.auto_apply)
        .map(|c| {
            let eval = evaluate_coupon(c, customer, cart, subtotal, now, config);
            (c, eval)
        })
        .filter(|(_, eval)| eval.eligible && eval.discount_cents > 0)
        .max_by(|(a, ea), (b, eb)| {
            ea.discount_cents
                .cmp(&eb.discount_cents)
                .then_with(|| b.code.cmp(&a.code))
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnforcementMode;
    use crate::types::{
        ConditionLogic, CouponReward, DiscountType, ItemType, RewardScope, TagMatchMode,
    };
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn order_percentage_reward(bps: i64, cap: Option<i64>) -> CouponReward {
        CouponReward {
            id: "r1".to_string(),
            coupon_id: "c1".to_string(),
            applies_to: RewardScope::Order,
            discount_type: DiscountType::Percentage,
            discount_value: bps,
            max_discount_cents: cap,
            target_product_id: None,
            target_service_id: None,
            target_product_category_id: None,
            target_service_category_id: None,
            created_at: now(),
        }
    }

    fn coupon(code: &str, rewards: Vec<CouponReward>) -> Coupon {
        Coupon {
            id: format!("id-{code}"),
            code: code.to_string(),
            status: CouponStatus::Active,
            auto_apply: false,
            customer_id: None,
            customer_tags: vec![],
            tag_match_mode: TagMatchMode::Any,
            target_customer_type: None,
            condition_logic: ConditionLogic::And,
            requires_product_ids: vec![],
            requires_service_ids: vec![],
            requires_product_category_ids: vec![],
            requires_service_category_ids: vec![],
            min_purchase_cents: None,
            max_customer_visits: None,
            is_single_use: false,
            use_count: 0,
            max_uses: None,
            expires_at: None,
            campaign_id: None,
            rewards,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn service_cart(cents: i64) -> Vec<CartItem> {
        vec![CartItem {
            item_type: ItemType::Service,
            product_id: None,
            service_id: Some("svc-1".to_string()),
            category_id: None,
            item_name: "Full detail".to_string(),
            unit_price_cents: cents,
            quantity: 1,
            booked_total_cents: None,
            taxable: true,
        }]
    }

    #[test]
    fn test_capped_order_discount_end_to_end() {
        // $80 cart, 10% off order capped at $5 → $5.00, not $8.00
        let c = coupon("CAP5", vec![order_percentage_reward(1000, Some(500))]);
        let cart = service_cart(8000);
        let config = CheckoutConfig::new();

        let eval = evaluate_coupon(&c, None, &cart, Money::from_cents(8000), now(), &config);
        assert!(eval.eligible);
        assert_eq!(eval.discount_cents, 500);
        assert!(eval.failed_conditions.is_empty());
    }

    #[test]
    fn test_inactive_coupon_is_structured_ineligibility() {
        let mut c = coupon("DRAFT", vec![order_percentage_reward(1000, None)]);
        c.status = CouponStatus::Draft;

        let eval = evaluate_coupon(&c, None, &[], Money::zero(), now(), &CheckoutConfig::new());
        assert!(!eval.eligible);
        assert_eq!(eval.discount_cents, 0);
        assert_eq!(eval.failed_conditions.len(), 1);
    }

    #[test]
    fn test_expired_coupon() {
        let mut c = coupon("OLD", vec![order_percentage_reward(1000, None)]);
        c.expires_at = Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());

        let eval = evaluate_coupon(&c, None, &[], Money::zero(), now(), &CheckoutConfig::new());
        assert!(!eval.eligible);
        assert!(eval.failed_conditions[0].contains("expired"));
    }

    #[test]
    fn test_exhausted_coupon() {
        let mut c = coupon("MAXED", vec![order_percentage_reward(1000, None)]);
        c.max_uses = Some(10);
        c.use_count = 10;

        let eval = evaluate_coupon(&c, None, &[], Money::zero(), now(), &CheckoutConfig::new());
        assert!(!eval.eligible);
        assert!(eval.failed_conditions[0].contains("usage limit"));
    }

    #[test]
    fn test_soft_class_warning_carried_through() {
        let mut c = coupon("MEMBERS", vec![order_percentage_reward(1000, None)]);
        c.target_customer_type = Some("member".to_string());

        let config = CheckoutConfig::new().enforcement(EnforcementMode::Soft);
        let cart = service_cart(8000);
        let eval = evaluate_coupon(&c, None, &cart, Money::from_cents(8000), now(), &config);

        assert!(eval.eligible);
        assert_eq!(eval.warnings.len(), 1);
        assert_eq!(eval.discount_cents, 800);
    }

    #[test]
    fn test_failed_conditions_surface_missing_items() {
        let mut c = coupon("BUNDLE", vec![order_percentage_reward(1000, None)]);
        c.requires_product_ids = vec!["p-wax".to_string()];

        let cart = service_cart(8000);
        let eval = evaluate_coupon(
            &c,
            None,
            &cart,
            Money::from_cents(8000),
            now(),
            &CheckoutConfig::new(),
        );

        assert!(!eval.eligible);
        assert_eq!(eval.missing_items, vec!["product:p-wax"]);
    }

    #[test]
    fn test_pick_auto_apply_takes_best_discount() {
        let mut small = coupon("SMALL", vec![order_percentage_reward(500, None)]);
        small.auto_apply = true;
        let mut big = coupon("BIG", vec![order_percentage_reward(2000, None)]);
        big.auto_apply = true;
        let manual = coupon("MANUAL", vec![order_percentage_reward(9000, None)]);

        let cart = service_cart(10000);
        let candidates = [small, big, manual];
        let picked = pick_auto_apply(
            &candidates,
            None,
            &cart,
            Money::from_cents(10000),
            now(),
            &CheckoutConfig::new(),
        );

        let (winner, eval) = picked.expect("an auto-apply coupon should win");
        assert_eq!(winner.code, "BIG");
        assert_eq!(eval.discount_cents, 2000);
    }

    #[test]
    fn test_pick_auto_apply_none_when_nothing_eligible() {
        let mut c = coupon("MAXED", vec![order_percentage_reward(1000, None)]);
        c.auto_apply = true;
        c.max_uses = Some(1);
        c.use_count = 1;

        let cart = service_cart(10000);
        let candidates = [c];
        let picked = pick_auto_apply(
            &candidates,
            None,
            &cart,
            Money::from_cents(10000),
            now(),
            &CheckoutConfig::new(),
        );
        assert!(picked.is_none());
    }
}
