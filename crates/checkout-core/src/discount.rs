//! # Discount Calculator
//!
//! Given a coupon's reward rules and the cart, computes a single monetary
//! discount. Independent of targeting and conditions.
//!
//! ## Calculation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  For each reward, independently:                                        │
//! │                                                                         │
//! │  1. Applicable base:                                                    │
//! │     order scope    ──► subtotal                                         │
//! │     product/service──► Σ line totals over matching items:               │
//! │                        • target id set   → lines with that id           │
//! │                        • else category   → lines in that category       │
//! │                        • else            → all lines of the type        │
//! │     no matching items ──► reward contributes zero                       │
//! │                                                                         │
//! │  2. Apply discount type to the base:                                    │
//! │     percentage ──► base × bps/10000 (half-up), clamped to max_discount  │
//! │     flat       ──► min(value, base)                                     │
//! │     free       ──► the full base                                        │
//! │                                                                         │
//! │  3. Round each reward's contribution to cents BEFORE summing            │
//! │     (integer cents make this inherent), then clamp the SUM to the       │
//! │     subtotal.                                                           │
//! │                                                                         │
//! │  The round-per-reward-then-clamp-the-sum order is normative: totals     │
//! │  must be bit-reproducible across reimplementations.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::money::Money;
use crate::types::{CartItem, CouponReward, DiscountType, ItemType, RewardScope};

// =============================================================================
// Calculation
// =============================================================================

/// Computes the total discount for a set of reward rules against a cart.
///
/// Returns a non-negative amount that never exceeds the subtotal. Pure:
/// targeting and conditions are evaluated elsewhere.
pub fn calculate_discount(rewards: &[CouponReward], cart: &[CartItem], subtotal: Money) -> Money {
    let mut total = Money::zero();

    for reward in rewards {
        total += reward_contribution(reward, cart, subtotal);
    }

    // A coupon can never produce a negative payable amount.
    total.clamp_to(subtotal)
}

/// One reward's contribution, rounded to cents.
fn reward_contribution(reward: &CouponReward, cart: &[CartItem], subtotal: Money) -> Money {
    let base = applicable_base(reward, cart, subtotal);
    if base.is_zero() {
        return Money::zero();
    }

    match reward.discount_type {
        DiscountType::Percentage => {
            let raw = base.percent_of(reward.discount_value.max(0) as u32);
            match reward.max_discount_cents {
                Some(cap) => raw.min(Money::from_cents(cap.max(0))),
                None => raw,
            }
        }
        DiscountType::Flat => Money::from_cents(reward.discount_value.max(0)).min(base),
        DiscountType::Free => base,
    }
}

/// The monetary amount a reward's rule is computed against.
fn applicable_base(reward: &CouponReward, cart: &[CartItem], subtotal: Money) -> Money {
    let scope_type = match reward.applies_to {
        RewardScope::Order => return subtotal,
        RewardScope::Product => ItemType::Product,
        RewardScope::Service => ItemType::Service,
    };

    let matched = cart
        .iter()
        .filter(|item| item.item_type == scope_type)
        .filter(|item| match (reward.target_id(), reward.target_category_id()) {
            // Target id set: only lines with that id
            (Some(id), _) => item.catalog_id() == Some(id),
            // No id, category set: only lines in that category
            (None, Some(cat)) => item.category_id.as_deref() == Some(cat),
            // Neither: all lines of the type
            (None, None) => true,
        })
        .map(|item| item.line_total_cents())
        .sum::<i64>();

    Money::from_cents(matched)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reward(
        applies_to: RewardScope,
        discount_type: DiscountType,
        value: i64,
        cap: Option<i64>,
    ) -> CouponReward {
        CouponReward {
            id: "r1".to_string(),
            coupon_id: "c1".to_string(),
            applies_to,
            discount_type,
            discount_value: value,
            max_discount_cents: cap,
            target_product_id: None,
            target_service_id: None,
            target_product_category_id: None,
            target_service_category_id: None,
            created_at: Utc::now(),
        }
    }

    fn product_item(id: &str, category: Option<&str>, cents: i64, qty: i64) -> CartItem {
        CartItem {
            item_type: ItemType::Product,
            product_id: Some(id.to_string()),
            service_id: None,
            category_id: category.map(|c| c.to_string()),
            item_name: id.to_string(),
            unit_price_cents: cents,
            quantity: qty,
            booked_total_cents: None,
            taxable: true,
        }
    }

    fn service_item(id: &str, category: Option<&str>, cents: i64) -> CartItem {
        CartItem {
            item_type: ItemType::Service,
            product_id: None,
            service_id: Some(id.to_string()),
            category_id: category.map(|c| c.to_string()),
            item_name: id.to_string(),
            unit_price_cents: cents,
            quantity: 1,
            booked_total_cents: None,
            taxable: true,
        }
    }

    #[test]
    fn test_order_percentage() {
        let rewards = vec![reward(RewardScope::Order, DiscountType::Percentage, 1000, None)];
        let discount = calculate_discount(&rewards, &[], Money::from_cents(8000));
        assert_eq!(discount.cents(), 800); // 10% of $80.00
    }

    #[test]
    fn test_percentage_cap_honored() {
        // 50% off with a $10.00 cap on a $100.00 base yields exactly $10.00
        let rewards = vec![reward(
            RewardScope::Order,
            DiscountType::Percentage,
            5000,
            Some(1000),
        )];
        let discount = calculate_discount(&rewards, &[], Money::from_cents(10000));
        assert_eq!(discount.cents(), 1000);
    }

    #[test]
    fn test_percentage_under_cap_untouched() {
        // 10% of $80 = $8.00, cap $20.00 does not bind
        let rewards = vec![reward(
            RewardScope::Order,
            DiscountType::Percentage,
            1000,
            Some(2000),
        )];
        let discount = calculate_discount(&rewards, &[], Money::from_cents(8000));
        assert_eq!(discount.cents(), 800);
    }

    #[test]
    fn test_flat_never_exceeds_base() {
        let cart = vec![product_item("p1", None, 300, 1)];
        let rewards = vec![reward(RewardScope::Product, DiscountType::Flat, 500, None)];
        // Flat $5.00 against a $3.00 base contributes only $3.00
        let discount = calculate_discount(&rewards, &cart, Money::from_cents(300));
        assert_eq!(discount.cents(), 300);
    }

    #[test]
    fn test_free_takes_full_base() {
        let cart = vec![
            service_item("svc-1", None, 4500),
            product_item("p1", None, 1000, 1),
        ];
        let mut r = reward(RewardScope::Service, DiscountType::Free, 0, None);
        r.target_service_id = Some("svc-1".to_string());
        let discount = calculate_discount(&[r], &cart, Money::from_cents(5500));
        assert_eq!(discount.cents(), 4500);
    }

    #[test]
    fn test_target_id_narrows_base() {
        let cart = vec![
            product_item("p1", Some("cat-a"), 2000, 1),
            product_item("p2", Some("cat-a"), 3000, 1),
        ];
        let mut r = reward(RewardScope::Product, DiscountType::Percentage, 5000, None);
        r.target_product_id = Some("p2".to_string());
        // 50% of only p2's $30.00
        let discount = calculate_discount(&[r], &cart, Money::from_cents(5000));
        assert_eq!(discount.cents(), 1500);
    }

    #[test]
    fn test_target_category_when_no_id() {
        let cart = vec![
            product_item("p1", Some("cat-a"), 2000, 1),
            product_item("p2", Some("cat-b"), 3000, 1),
        ];
        let mut r = reward(RewardScope::Product, DiscountType::Percentage, 1000, None);
        r.target_product_category_id = Some("cat-a".to_string());
        let discount = calculate_discount(&[r], &cart, Money::from_cents(5000));
        assert_eq!(discount.cents(), 200); // 10% of cat-a's $20.00
    }

    #[test]
    fn test_untargeted_scope_covers_all_of_type() {
        let cart = vec![
            product_item("p1", None, 2000, 2), // $40.00
            service_item("svc-1", None, 9000), // excluded: wrong type
        ];
        let r = reward(RewardScope::Product, DiscountType::Percentage, 1000, None);
        let discount = calculate_discount(&[r], &cart, Money::from_cents(13000));
        assert_eq!(discount.cents(), 400); // 10% of product lines only
    }

    #[test]
    fn test_no_matching_items_contributes_zero() {
        let cart = vec![service_item("svc-1", None, 9000)];
        let mut r = reward(RewardScope::Product, DiscountType::Free, 0, None);
        r.target_product_id = Some("p-missing".to_string());
        let discount = calculate_discount(&[r], &cart, Money::from_cents(9000));
        assert_eq!(discount.cents(), 0);
    }

    #[test]
    fn test_multiple_rewards_rounded_independently_then_summed() {
        // Two 0.5%-style rewards on odd bases: each contribution rounds
        // half-up on its own before the sum.
        let cart = vec![
            product_item("p1", None, 1099, 1), // $10.99
            service_item("svc-1", None, 2099), // $20.99
        ];
        let p = reward(RewardScope::Product, DiscountType::Percentage, 825, None);
        let s = reward(RewardScope::Service, DiscountType::Percentage, 825, None);
        // 8.25% of 1099 = 90.6675 → 91; 8.25% of 2099 = 173.1675 → 173
        let discount = calculate_discount(&[p, s], &cart, Money::from_cents(3198));
        assert_eq!(discount.cents(), 91 + 173);
    }

    #[test]
    fn test_sum_clamped_to_subtotal() {
        // Flat $60 + free order on an $80 subtotal must clamp to $80
        let rewards = vec![
            reward(RewardScope::Order, DiscountType::Flat, 6000, None),
            reward(RewardScope::Order, DiscountType::Free, 0, None),
        ];
        let discount = calculate_discount(&rewards, &[], Money::from_cents(8000));
        assert_eq!(discount.cents(), 8000);
    }

    #[test]
    fn test_discount_never_negative() {
        let discount = calculate_discount(&[], &[], Money::from_cents(8000));
        assert_eq!(discount.cents(), 0);
    }

    #[test]
    fn test_booked_total_feeds_base() {
        // A service line booked as a package uses its booked total
        let mut item = service_item("svc-1", None, 0);
        item.quantity = 3;
        item.booked_total_cents = Some(12000);
        let mut r = reward(RewardScope::Service, DiscountType::Percentage, 1000, None);
        r.target_service_id = Some("svc-1".to_string());
        let discount = calculate_discount(&[r], &[item], Money::from_cents(12000));
        assert_eq!(discount.cents(), 1200);
    }
}
