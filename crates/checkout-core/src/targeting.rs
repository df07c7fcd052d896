//! # Targeting Evaluator
//!
//! Decides whether a coupon is eligible for a given customer: identity,
//! tags, and customer class. Independent of cart contents.
//!
//! ## Rule Order (short-circuit)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. customer_id set?                                                    │
//! │     └── no customer, or mismatch ──► FAIL (no warning)                  │
//! │  2. customer_tags non-empty?                                            │
//! │     └── no customer, or tags miss per match mode ──► FAIL (no warning)  │
//! │  3. target_customer_type set, and customer's class differs?             │
//! │     ├── Hard mode ──► FAIL                                              │
//! │     └── Soft mode ──► PASS + warning naming the intended class          │
//! │                                                                         │
//! │  The asymmetry is intentional: class targeting is a merchandising       │
//! │  hint, identity/tag targeting is a hard eligibility gate.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::config::EnforcementMode;
use crate::types::{Coupon, Customer, TagMatchMode};

// =============================================================================
// Outcome
// =============================================================================

/// Result of targeting evaluation. Ineligibility is data, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetingOutcome {
    pub passed: bool,
    /// Present only on a soft-mode class mismatch; the caller may surface
    /// it to staff without blocking checkout.
    pub warning: Option<String>,
}

impl TargetingOutcome {
    fn pass() -> Self {
        TargetingOutcome {
            passed: true,
            warning: None,
        }
    }

    fn fail() -> Self {
        TargetingOutcome {
            passed: false,
            warning: None,
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluates whether a coupon targets the given customer.
///
/// Pure: no I/O, no clock. `customer` is `None` for anonymous checkouts.
pub fn evaluate_targeting(
    coupon: &Coupon,
    customer: Option<&Customer>,
    mode: EnforcementMode,
) -> TargetingOutcome {
    // 1. Exact identity restriction: hard gate.
    if let Some(required_id) = &coupon.customer_id {
        match customer {
            Some(c) if &c.id == required_id => {}
            _ => return TargetingOutcome::fail(),
        }
    }

    // 2. Tag restriction: hard gate. An anonymous checkout can never
    //    satisfy a tag-targeted coupon.
    if !coupon.customer_tags.is_empty() {
        let Some(c) = customer else {
            return TargetingOutcome::fail();
        };
        let matched = match coupon.tag_match_mode {
            TagMatchMode::All => coupon.customer_tags.iter().all(|t| c.has_tag(t)),
            TagMatchMode::Any => coupon.customer_tags.iter().any(|t| c.has_tag(t)),
        };
        if !matched {
            return TargetingOutcome::fail();
        }
    }

    // 3. Class restriction: soft or hard per the caller-supplied mode.
    if let Some(target_type) = &coupon.target_customer_type {
        let matches = customer
            .and_then(|c| c.customer_type.as_ref())
            .map(|t| t == target_type)
            .unwrap_or(false);

        if !matches {
            return match mode {
                EnforcementMode::Hard => TargetingOutcome::fail(),
                EnforcementMode::Soft => TargetingOutcome {
                    passed: true,
                    warning: Some(format!(
                        "Coupon {} is intended for {} customers",
                        coupon.code, target_type
                    )),
                },
            };
        }
    }

    TargetingOutcome::pass()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConditionLogic, CouponStatus};
    use chrono::Utc;

    fn coupon() -> Coupon {
        Coupon {
            id: "c1".to_string(),
            code: "VIP20".to_string(),
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

    fn customer(tags: &[&str], customer_type: Option<&str>) -> Customer {
        Customer {
            id: "cust-1".to_string(),
            name: "Jordan".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            customer_type: customer_type.map(|t| t.to_string()),
            visit_count: 3,
            lifetime_spend_cents: 45000,
            loyalty_points_balance: 120,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_untargeted_coupon_passes_anonymous() {
        let outcome = evaluate_targeting(&coupon(), None, EnforcementMode::Soft);
        assert!(outcome.passed);
        assert!(outcome.warning.is_none());
    }

    #[test]
    fn test_identity_restriction() {
        let mut c = coupon();
        c.customer_id = Some("cust-1".to_string());

        // No customer → fail, no warning
        let outcome = evaluate_targeting(&c, None, EnforcementMode::Soft);
        assert!(!outcome.passed);
        assert!(outcome.warning.is_none());

        // Wrong customer → fail
        let mut other = customer(&[], None);
        other.id = "cust-2".to_string();
        assert!(!evaluate_targeting(&c, Some(&other), EnforcementMode::Soft).passed);

        // Right customer → pass
        let right = customer(&[], None);
        assert!(evaluate_targeting(&c, Some(&right), EnforcementMode::Soft).passed);
    }

    #[test]
    fn test_tag_match_all_vs_any() {
        let mut c = coupon();
        c.customer_tags = vec!["vip".to_string(), "fleet".to_string()];

        let only_vip = customer(&["vip"], None);

        // All mode: both tags required → fail with only one
        c.tag_match_mode = TagMatchMode::All;
        assert!(!evaluate_targeting(&c, Some(&only_vip), EnforcementMode::Soft).passed);

        // Any mode: one tag is enough → pass
        c.tag_match_mode = TagMatchMode::Any;
        assert!(evaluate_targeting(&c, Some(&only_vip), EnforcementMode::Soft).passed);

        // Both tags satisfy All mode
        c.tag_match_mode = TagMatchMode::All;
        let both = customer(&["vip", "fleet"], None);
        assert!(evaluate_targeting(&c, Some(&both), EnforcementMode::Soft).passed);
    }

    #[test]
    fn test_tags_fail_for_anonymous() {
        let mut c = coupon();
        c.customer_tags = vec!["vip".to_string()];
        assert!(!evaluate_targeting(&c, None, EnforcementMode::Soft).passed);
    }

    #[test]
    fn test_class_mismatch_soft_warns_hard_fails() {
        let mut c = coupon();
        c.target_customer_type = Some("member".to_string());

        let walk_in = customer(&[], Some("walk_in"));

        // Soft: pass with a warning naming the intended class
        let soft = evaluate_targeting(&c, Some(&walk_in), EnforcementMode::Soft);
        assert!(soft.passed);
        let warning = soft.warning.expect("soft mismatch should warn");
        assert!(warning.contains("member"));

        // Hard: fail
        let hard = evaluate_targeting(&c, Some(&walk_in), EnforcementMode::Hard);
        assert!(!hard.passed);

        // Matching class: pass, no warning
        let member = customer(&[], Some("member"));
        let matched = evaluate_targeting(&c, Some(&member), EnforcementMode::Soft);
        assert!(matched.passed);
        assert!(matched.warning.is_none());
    }

    #[test]
    fn test_class_mismatch_anonymous_soft_warns() {
        let mut c = coupon();
        c.target_customer_type = Some("member".to_string());
        let outcome = evaluate_targeting(&c, None, EnforcementMode::Soft);
        assert!(outcome.passed);
        assert!(outcome.warning.is_some());
    }

    #[test]
    fn test_identity_gate_checked_before_class_hint() {
        let mut c = coupon();
        c.customer_id = Some("cust-9".to_string());
        c.target_customer_type = Some("member".to_string());

        // Identity fails first: no warning attached even in soft mode
        let wrong = customer(&[], Some("walk_in"));
        let outcome = evaluate_targeting(&c, Some(&wrong), EnforcementMode::Soft);
        assert!(!outcome.passed);
        assert!(outcome.warning.is_none());
    }
}
