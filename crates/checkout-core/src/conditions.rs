//! # Condition Evaluator
//!
//! Decides whether a coupon's usage conditions are satisfied by the
//! current cart: required items/categories, minimum spend, visit-count
//! ceiling. Sub-conditions combine with AND/OR logic.
//!
//! ## Generic Condition Model
//! Rather than hand-coding every condition type's boolean, each configured
//! condition becomes a [`ConditionCheck`] (kind, met flag, human-readable
//! description, machine-readable missing tags), and the configured
//! [`ConditionLogic`] folds the list. Adding a condition kind touches only
//! the check builder, never the combinator.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{CartItem, ConditionLogic, Coupon, Customer, ItemType};

// =============================================================================
// Condition Checks
// =============================================================================

/// The kind of a configured condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    RequiredProduct,
    RequiredService,
    RequiredProductCategory,
    RequiredServiceCategory,
    MinimumPurchase,
    MaximumVisits,
}

/// One evaluated condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionCheck {
    pub kind: ConditionKind,
    pub met: bool,
    /// Human-readable description for "coupon not eligible" messaging.
    pub description: String,
    /// Machine-readable tags naming what could be added to the cart to
    /// satisfy this condition (`product:<id>`, `service-category:<id>`,
    /// `min-purchase:<cents>`). Empty when met, and empty for conditions
    /// not fixable by adding items (visit ceiling).
    pub missing_tags: Vec<String>,
}

/// Result of condition evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionOutcome {
    pub passed: bool,
    /// Descriptions of every unmet condition, for messaging.
    pub failed_conditions: Vec<String>,
    /// Missing-item tags from every unmet condition, for suggesting cart
    /// additions.
    pub missing_items: Vec<String>,
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluates a coupon's configured conditions against the cart.
///
/// Zero configured conditions ⇒ the coupon passes unconditionally.
/// Otherwise `condition_logic` combines the checks: `And` requires all
/// met, `Or` requires at least one.
pub fn evaluate_conditions(
    coupon: &Coupon,
    cart: &[CartItem],
    subtotal: Money,
    customer: Option<&Customer>,
) -> ConditionOutcome {
    if !coupon.has_conditions() {
        return ConditionOutcome {
            passed: true,
            failed_conditions: Vec::new(),
            missing_items: Vec::new(),
        };
    }

    let checks = build_checks(coupon, cart, subtotal, customer);

    let passed = match coupon.condition_logic {
        ConditionLogic::And => checks.iter().all(|c| c.met),
        ConditionLogic::Or => checks.iter().any(|c| c.met),
    };

    // Unmet conditions are surfaced even when the coupon passes under Or
    // logic; the caller decides what to show.
    let failed_conditions = checks
        .iter()
        .filter(|c| !c.met)
        .map(|c| c.description.clone())
        .collect();
    let missing_items = checks
        .iter()
        .filter(|c| !c.met)
        .flat_map(|c| c.missing_tags.iter().cloned())
        .collect();

    ConditionOutcome {
        passed,
        failed_conditions,
        missing_items,
    }
}

/// Builds one [`ConditionCheck`] per configured condition.
fn build_checks(
    coupon: &Coupon,
    cart: &[CartItem],
    subtotal: Money,
    customer: Option<&Customer>,
) -> Vec<ConditionCheck> {
    let mut checks = Vec::new();

    if !coupon.requires_product_ids.is_empty() {
        checks.push(required_item_check(
            ConditionKind::RequiredProduct,
            ItemType::Product,
            "product",
            &coupon.requires_product_ids,
            cart,
        ));
    }

    if !coupon.requires_service_ids.is_empty() {
        checks.push(required_item_check(
            ConditionKind::RequiredService,
            ItemType::Service,
            "service",
            &coupon.requires_service_ids,
            cart,
        ));
    }

    if !coupon.requires_product_category_ids.is_empty() {
        checks.push(required_category_check(
            ConditionKind::RequiredProductCategory,
            ItemType::Product,
            "product-category",
            &coupon.requires_product_category_ids,
            cart,
        ));
    }

    if !coupon.requires_service_category_ids.is_empty() {
        checks.push(required_category_check(
            ConditionKind::RequiredServiceCategory,
            ItemType::Service,
            "service-category",
            &coupon.requires_service_category_ids,
            cart,
        ));
    }

    if let Some(min_cents) = coupon.min_purchase_cents {
        let min = Money::from_cents(min_cents);
        let met = subtotal >= min;
        checks.push(ConditionCheck {
            kind: ConditionKind::MinimumPurchase,
            met,
            description: format!("Minimum purchase of {min} required"),
            missing_tags: if met {
                Vec::new()
            } else {
                vec![format!("min-purchase:{min_cents}")]
            },
        });
    }

    if let Some(max_visits) = coupon.max_customer_visits {
        // Absent customer ⇒ not met: the visit history is unknown.
        let met = customer.map(|c| c.visit_count <= max_visits).unwrap_or(false);
        checks.push(ConditionCheck {
            kind: ConditionKind::MaximumVisits,
            met,
            description: format!("Only for customers with at most {max_visits} visits"),
            // Not fixable by adding items: no missing tag.
            missing_tags: Vec::new(),
        });
    }

    checks
}

/// Met if any cart item of the matching type carries one of the required
/// ids.
fn required_item_check(
    kind: ConditionKind,
    item_type: ItemType,
    tag_prefix: &str,
    required_ids: &[String],
    cart: &[CartItem],
) -> ConditionCheck {
    let met = cart.iter().any(|item| {
        item.item_type == item_type
            && item
                .catalog_id()
                .map(|id| required_ids.iter().any(|r| r == id))
                .unwrap_or(false)
    });

    ConditionCheck {
        kind,
        met,
        description: format!("Cart must contain a required {tag_prefix}"),
        missing_tags: if met {
            Vec::new()
        } else {
            required_ids
                .iter()
                .map(|id| format!("{tag_prefix}:{id}"))
                .collect()
        },
    }
}

/// Met if any cart item of the matching type falls in one of the required
/// categories.
fn required_category_check(
    kind: ConditionKind,
    item_type: ItemType,
    tag_prefix: &str,
    required_category_ids: &[String],
    cart: &[CartItem],
) -> ConditionCheck {
    let met = cart.iter().any(|item| {
        item.item_type == item_type
            && item
                .category_id
                .as_deref()
                .map(|cat| required_category_ids.iter().any(|r| r == cat))
                .unwrap_or(false)
    });

    ConditionCheck {
        kind,
        met,
        description: format!("Cart must contain an item from a required {tag_prefix}"),
        missing_tags: if met {
            Vec::new()
        } else {
            required_category_ids
                .iter()
                .map(|id| format!("{tag_prefix}:{id}"))
                .collect()
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CouponStatus, TagMatchMode};
    use chrono::Utc;

    fn coupon() -> Coupon {
        Coupon {
            id: "c1".to_string(),
            code: "BUNDLE".to_string(),
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
            rewards: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn product_item(id: &str, category: Option<&str>, cents: i64) -> CartItem {
        CartItem {
            item_type: ItemType::Product,
            product_id: Some(id.to_string()),
            service_id: None,
            category_id: category.map(|c| c.to_string()),
            item_name: id.to_string(),
            unit_price_cents: cents,
            quantity: 1,
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

    fn customer_with_visits(visits: i64) -> Customer {
        Customer {
            id: "cust-1".to_string(),
            name: "Sam".to_string(),
            tags: vec![],
            customer_type: None,
            visit_count: visits,
            lifetime_spend_cents: 0,
            loyalty_points_balance: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_conditions_passes_unconditionally() {
        let outcome = evaluate_conditions(&coupon(), &[], Money::zero(), None);
        assert!(outcome.passed);
        assert!(outcome.failed_conditions.is_empty());
        assert!(outcome.missing_items.is_empty());
    }

    #[test]
    fn test_and_requires_all_conditions() {
        // minPurchase=$50 AND product category X
        let mut c = coupon();
        c.min_purchase_cents = Some(5000);
        c.requires_product_category_ids = vec!["cat-x".to_string()];

        // Subtotal $60 but no item in category X → fail under AND
        let cart = vec![product_item("p1", Some("cat-y"), 6000)];
        let outcome = evaluate_conditions(&c, &cart, Money::from_cents(6000), None);
        assert!(!outcome.passed);
        assert_eq!(outcome.failed_conditions.len(), 1);
        assert_eq!(outcome.missing_items, vec!["product-category:cat-x"]);

        // Same cart under OR → pass (min purchase met)
        c.condition_logic = ConditionLogic::Or;
        let outcome = evaluate_conditions(&c, &cart, Money::from_cents(6000), None);
        assert!(outcome.passed);
        // The unmet category condition is still surfaced
        assert_eq!(outcome.failed_conditions.len(), 1);
    }

    #[test]
    fn test_required_product_matches_by_id() {
        let mut c = coupon();
        c.requires_product_ids = vec!["p-wax".to_string(), "p-polish".to_string()];

        let missing = vec![product_item("p-soap", None, 1000)];
        let outcome = evaluate_conditions(&c, &missing, Money::from_cents(1000), None);
        assert!(!outcome.passed);
        assert_eq!(
            outcome.missing_items,
            vec!["product:p-wax", "product:p-polish"]
        );

        let present = vec![product_item("p-polish", None, 1000)];
        assert!(evaluate_conditions(&c, &present, Money::from_cents(1000), None).passed);
    }

    #[test]
    fn test_required_service_ignores_product_lines() {
        let mut c = coupon();
        c.requires_service_ids = vec!["svc-cut".to_string()];

        // A product with the same id must not satisfy a service condition
        let cart = vec![product_item("svc-cut", None, 2000)];
        assert!(!evaluate_conditions(&c, &cart, Money::from_cents(2000), None).passed);

        let cart = vec![service_item("svc-cut", None, 2000)];
        assert!(evaluate_conditions(&c, &cart, Money::from_cents(2000), None).passed);
    }

    #[test]
    fn test_required_service_category() {
        let mut c = coupon();
        c.requires_service_category_ids = vec!["detailing".to_string()];

        let cart = vec![service_item("svc-1", Some("detailing"), 9000)];
        assert!(evaluate_conditions(&c, &cart, Money::from_cents(9000), None).passed);

        let cart = vec![service_item("svc-1", Some("barber"), 9000)];
        let outcome = evaluate_conditions(&c, &cart, Money::from_cents(9000), None);
        assert!(!outcome.passed);
        assert_eq!(outcome.missing_items, vec!["service-category:detailing"]);
    }

    #[test]
    fn test_min_purchase_boundary() {
        let mut c = coupon();
        c.min_purchase_cents = Some(5000);

        // Exactly at the minimum is met
        assert!(evaluate_conditions(&c, &[], Money::from_cents(5000), None).passed);
        assert!(!evaluate_conditions(&c, &[], Money::from_cents(4999), None).passed);
    }

    #[test]
    fn test_max_visits_requires_customer() {
        let mut c = coupon();
        c.max_customer_visits = Some(3);

        // Absent customer ⇒ not met
        let outcome = evaluate_conditions(&c, &[], Money::zero(), None);
        assert!(!outcome.passed);
        // Visit ceiling contributes no missing-item tag
        assert!(outcome.missing_items.is_empty());
        assert_eq!(outcome.failed_conditions.len(), 1);

        let new_customer = customer_with_visits(2);
        assert!(evaluate_conditions(&c, &[], Money::zero(), Some(&new_customer)).passed);

        // Boundary: exactly max visits still qualifies
        let at_max = customer_with_visits(3);
        assert!(evaluate_conditions(&c, &[], Money::zero(), Some(&at_max)).passed);

        let regular = customer_with_visits(4);
        assert!(!evaluate_conditions(&c, &[], Money::zero(), Some(&regular)).passed);
    }

    #[test]
    fn test_or_logic_fails_when_nothing_met() {
        let mut c = coupon();
        c.condition_logic = ConditionLogic::Or;
        c.min_purchase_cents = Some(5000);
        c.requires_product_ids = vec!["p-wax".to_string()];

        let cart = vec![product_item("p-soap", None, 1000)];
        let outcome = evaluate_conditions(&c, &cart, Money::from_cents(1000), None);
        assert!(!outcome.passed);
        assert_eq!(outcome.failed_conditions.len(), 2);
    }
}
