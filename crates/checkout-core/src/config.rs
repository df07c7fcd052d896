//! # Engine Configuration
//!
//! Explicit configuration for the evaluators and the settlement pipeline.
//!
//! ## Why Not Globals?
//! Feature toggles and rates are passed in at call time, never read from
//! ambient state, so tests can exercise both settings of every toggle
//! deterministically and two callers can run with different settings in
//! the same process.

use serde::{Deserialize, Serialize};

// =============================================================================
// Enforcement Mode
// =============================================================================

/// How customer-class targeting mismatches are handled.
///
/// Identity and tag targeting always fail hard; class targeting is a
/// merchandising hint, so the caller chooses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    /// Pass with a human-readable warning naming the intended class.
    /// Staff may surface the warning without blocking checkout.
    Soft,
    /// Fail targeting outright.
    Hard,
}

// =============================================================================
// Checkout Config
// =============================================================================

/// Engine configuration.
///
/// ## Example
/// ```rust
/// use checkout_core::config::CheckoutConfig;
///
/// let config = CheckoutConfig::new()
///     .earn_rate_bps(10_000)   // 1 point per dollar
///     .card_fee_bps(250);      // 2.5% card fee on tips
/// assert!(config.loyalty_enabled);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Customer-class targeting enforcement.
    /// Default: Soft
    pub enforcement: EnforcementMode,

    /// Master toggle for the loyalty program. When off, settlement skips
    /// redemption, earning, and ledger writes entirely.
    /// Default: true
    pub loyalty_enabled: bool,

    /// Points earned per dollar of earnable spend, in basis points.
    /// 10_000 = 1 point per dollar; 100 = 0.01 points per dollar.
    /// Default: 10_000
    pub earn_rate_bps: u32,

    /// Dollar value of one redeemed point, in cents.
    /// Default: 1 (a point is worth a cent)
    pub point_value_cents: i64,

    /// Card-processing fee removed from card tips before staff payout,
    /// in basis points.
    /// Default: 250 (2.5%)
    pub card_fee_bps: u32,

    /// SKUs whose lines never accrue loyalty points (e.g. bottled water).
    pub excluded_skus: Vec<String>,
}

impl CheckoutConfig {
    /// Creates a configuration with default rates.
    pub fn new() -> Self {
        CheckoutConfig {
            enforcement: EnforcementMode::Soft,
            loyalty_enabled: true,
            earn_rate_bps: 10_000,
            point_value_cents: 1,
            card_fee_bps: 250,
            excluded_skus: Vec::new(),
        }
    }

    /// Sets the targeting enforcement mode.
    pub fn enforcement(mut self, mode: EnforcementMode) -> Self {
        self.enforcement = mode;
        self
    }

    /// Toggles the loyalty program.
    pub fn loyalty_enabled(mut self, enabled: bool) -> Self {
        self.loyalty_enabled = enabled;
        self
    }

    /// Sets the earn rate in basis points of a point per dollar.
    pub fn earn_rate_bps(mut self, bps: u32) -> Self {
        self.earn_rate_bps = bps;
        self
    }

    /// Sets the redemption value of one point, in cents.
    pub fn point_value_cents(mut self, cents: i64) -> Self {
        self.point_value_cents = cents;
        self
    }

    /// Sets the card fee removed from card tips, in basis points.
    pub fn card_fee_bps(mut self, bps: u32) -> Self {
        self.card_fee_bps = bps;
        self
    }

    /// Adds a loyalty-excluded SKU.
    pub fn exclude_sku(mut self, sku: impl Into<String>) -> Self {
        self.excluded_skus.push(sku.into());
        self
    }

    /// Whether the given SKU is excluded from point accrual.
    pub fn is_sku_excluded(&self, sku: &str) -> bool {
        self.excluded_skus.iter().any(|s| s == sku)
    }

    /// Points earned on the given earnable spend:
    /// `floor(cents * earn_rate_bps / 1_000_000)`.
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::config::CheckoutConfig;
    ///
    /// // 0.01 points per dollar: $80.00 earns floor(0.8) = 0 points
    /// let config = CheckoutConfig::new().earn_rate_bps(100);
    /// assert_eq!(config.points_for_spend(8000), 0);
    ///
    /// // 1 point per dollar: $35.00 earns 35 points
    /// let config = CheckoutConfig::new().earn_rate_bps(10_000);
    /// assert_eq!(config.points_for_spend(3500), 35);
    /// ```
    pub fn points_for_spend(&self, earnable_cents: i64) -> i64 {
        if earnable_cents <= 0 {
            return 0;
        }
        ((earnable_cents as i128 * self.earn_rate_bps as i128) / 1_000_000) as i64
    }

    /// Dollar value in cents of the given number of points.
    pub fn redemption_value_cents(&self, points: i64) -> i64 {
        points.max(0) * self.point_value_cents
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        CheckoutConfig::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = CheckoutConfig::new()
            .enforcement(EnforcementMode::Hard)
            .loyalty_enabled(false)
            .earn_rate_bps(100)
            .point_value_cents(5)
            .card_fee_bps(300)
            .exclude_sku("WATER-500");

        assert_eq!(config.enforcement, EnforcementMode::Hard);
        assert!(!config.loyalty_enabled);
        assert_eq!(config.earn_rate_bps, 100);
        assert_eq!(config.point_value_cents, 5);
        assert_eq!(config.card_fee_bps, 300);
        assert!(config.is_sku_excluded("WATER-500"));
        assert!(!config.is_sku_excluded("WAX-100"));
    }

    #[test]
    fn test_points_for_spend_floors() {
        // 0.01 points/$: $80 → 0.8 → 0
        let config = CheckoutConfig::new().earn_rate_bps(100);
        assert_eq!(config.points_for_spend(8000), 0);
        // $150 → 1.5 → 1
        assert_eq!(config.points_for_spend(15000), 1);
    }

    #[test]
    fn test_points_for_spend_negative_is_zero() {
        let config = CheckoutConfig::new();
        assert_eq!(config.points_for_spend(-100), 0);
        assert_eq!(config.points_for_spend(0), 0);
    }

    #[test]
    fn test_redemption_value() {
        let config = CheckoutConfig::new().point_value_cents(5);
        assert_eq!(config.redemption_value_cents(100), 500);
        assert_eq!(config.redemption_value_cents(-3), 0);
    }
}
