//! # Settlement Pipeline
//!
//! The transaction-commit orchestrator: persists the header and line
//! items, applies inventory decrements, updates customer lifetime stats,
//! applies loyalty earn/redeem, and attributes coupon/campaign usage - as
//! one logical unit of work.
//!
//! ## Pipeline States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  initiated                                                              │
//! │     │  1. insert header (status completed, caller-supplied totals)      │
//! │     ▼                                                                   │
//! │  items_recorded                                                         │
//! │     │  2. insert line items (snapshot, per-unit price for multi-qty    │
//! │     │     service lines = booked total / quantity)                      │
//! │     ▼                                                                   │
//! │  payments_recorded                                                      │
//! │     │  3. insert tenders (card tip nets out the processing fee)         │
//! │     ▼                                                                   │
//! │  inventory_applied                                                      │
//! │     │  4. conditional bounded decrement per product line                │
//! │     ▼                                                                   │
//! │  loyalty_applied                                                        │
//! │     │  5. visit/lifetime stats, redeem (clamped), earn, ledger rows     │
//! │     ▼                                                                   │
//! │  attribution_applied                                                    │
//! │     │  6. conditional use-count increment, campaign counters            │
//! │     ▼                                                                   │
//! │  committed                                                              │
//! │                                                                         │
//! │  ALL six steps run inside ONE database transaction. Any failure        │
//! │  before commit rolls the whole operation back: nothing earlier than    │
//! │  the header insert is ever a partial success, and no reader observes   │
//! │  a header without its items.                                           │
//! │                                                                         │
//! │  Unrelated checkouts proceed concurrently; shared rows (stock, use    │
//! │  counts, balances) serialize through their bounded conditional         │
//! │  updates, never through in-process locks.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{DbError, SettlementError, SettlementResult, SettlementStep};
use crate::pool::Database;
use crate::repository::customer::new_ledger_entry;
use crate::repository::transaction::{
    generate_item_id, generate_payment_id, generate_transaction_id,
};
use checkout_core::validation::{validate_cart, validate_draft};
use checkout_core::{
    CartItem, CheckoutConfig, Coupon, ItemType, LedgerAction, LoyaltyLedgerEntry,
    LoyaltyRedemption, Money, Payment, PaymentMethod, Product, Transaction, TransactionDraft,
    TransactionItem, TransactionStatus, ValidationError,
};

// =============================================================================
// Outcome
// =============================================================================

/// What a successful settlement produced.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    /// The committed header, including the final loyalty outcome.
    pub transaction: Transaction,
    /// Ledger rows appended by this settlement, in order.
    pub ledger_entries: Vec<LoyaltyLedgerEntry>,
}

// =============================================================================
// Pipeline
// =============================================================================

/// The settlement pipeline. Cheap to construct; holds the database handle
/// and the explicit engine configuration.
#[derive(Debug, Clone)]
pub struct SettlementPipeline {
    db: Database,
    config: CheckoutConfig,
}

impl SettlementPipeline {
    /// Creates a pipeline over the given database and configuration.
    pub fn new(db: Database, config: CheckoutConfig) -> Self {
        SettlementPipeline { db, config }
    }

    /// Settles one checkout: all six mutations, atomically.
    ///
    /// ## Arguments
    /// * `draft` - caller-assembled totals and tenders (validated, echoed)
    /// * `cart` - the cart lines being settled
    /// * `coupon` - the applied coupon, if any (already evaluated by the
    ///   caller; the use ceiling is re-checked atomically here)
    /// * `redemption` - loyalty points being spent, if any
    ///
    /// ## Errors
    /// * [`SettlementError::Invalid`] - rejected before any persistence
    /// * [`SettlementError::Step`] - a step failed; everything rolled back
    pub async fn settle(
        &self,
        draft: &TransactionDraft,
        cart: &[CartItem],
        coupon: Option<&Coupon>,
        redemption: Option<LoyaltyRedemption>,
    ) -> SettlementResult<SettlementOutcome> {
        // ---- Validation: reject bad shapes before touching any row ----
        // A disabled loyalty program ignores redemption requests, which
        // also forces the draft's loyalty discount to zero.
        let redemption = if self.config.loyalty_enabled {
            redemption
        } else {
            None
        };

        validate_cart(cart)?;
        validate_draft(draft, redemption.as_ref(), &self.config)?;

        if redemption.is_some() && draft.customer_id.is_none() {
            return Err(SettlementError::Invalid(ValidationError::Required {
                field: "customer_id".to_string(),
            }));
        }

        if let (Some(c), Some(draft_coupon)) = (coupon, draft.coupon_id.as_deref()) {
            if c.id != draft_coupon {
                return Err(SettlementError::Invalid(ValidationError::InvalidFormat {
                    field: "coupon_id".to_string(),
                    reason: "draft names a different coupon".to_string(),
                }));
            }
        }

        let transaction_id = generate_transaction_id();
        debug!(transaction_id = %transaction_id, total = draft.total_cents, "Settlement initiated");

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| SettlementError::at(SettlementStep::Header)(DbError::from(e)))?;

        // ---- 1. Header ----
        let mut transaction = Transaction {
            id: transaction_id.clone(),
            customer_id: draft.customer_id.clone(),
            coupon_id: coupon.map(|c| c.id.clone()).or(draft.coupon_id.clone()),
            status: TransactionStatus::Completed,
            subtotal_cents: draft.subtotal_cents,
            tax_cents: draft.tax_cents,
            tip_cents: draft.tip_cents,
            discount_cents: draft.discount_cents,
            loyalty_discount_cents: draft.loyalty_discount_cents,
            total_cents: draft.total_cents,
            payment_method: draft.payment_method,
            loyalty_points_earned: 0,
            loyalty_points_redeemed: 0,
            created_at: Utc::now(),
        };

        let transactions = self.db.transactions();
        transactions
            .insert_header(&mut tx, &transaction)
            .await
            .map_err(SettlementError::at(SettlementStep::Header))?;

        // ---- 2. Line items ----
        for item in cart {
            let row = TransactionItem {
                id: generate_item_id(),
                transaction_id: transaction_id.clone(),
                item_type: item.item_type,
                product_id: item.product_id.clone(),
                service_id: item.service_id.clone(),
                category_id: item.category_id.clone(),
                name_snapshot: item.item_name.clone(),
                unit_price_cents: item.per_unit_cents(),
                quantity: item.quantity,
                line_total_cents: item.line_total_cents(),
                taxable: item.taxable,
                created_at: Utc::now(),
            };
            transactions
                .insert_item(&mut tx, &row)
                .await
                .map_err(SettlementError::at(SettlementStep::Items))?;
        }

        // ---- 3. Payments ----
        for tender in &draft.payments {
            let tip = Money::from_cents(tender.tip_cents);
            let net_tip = match tender.method {
                PaymentMethod::Card => tip - tip.percent_of(self.config.card_fee_bps),
                PaymentMethod::Cash | PaymentMethod::Other => tip,
            };
            let payment = Payment {
                id: generate_payment_id(),
                transaction_id: transaction_id.clone(),
                method: tender.method,
                amount_cents: tender.amount_cents,
                tip_cents: tender.tip_cents,
                net_tip_cents: net_tip.cents(),
                reference: tender.reference.clone(),
                created_at: Utc::now(),
            };
            transactions
                .insert_payment(&mut tx, &payment)
                .await
                .map_err(SettlementError::at(SettlementStep::Payments))?;
        }

        // ---- 4. Inventory ----
        // Product metadata (track flag, loyalty eligibility) is read here
        // once per line; the decrement itself stays a single conditional
        // statement in the catalog repository.
        let catalog = self.db.catalog();
        let mut line_products: Vec<(&CartItem, Option<Product>)> = Vec::with_capacity(cart.len());

        for item in cart {
            if item.item_type != ItemType::Product {
                line_products.push((item, None));
                continue;
            }
            let product_id = item.product_id.as_deref().unwrap_or_default();
            let product = sqlx::query_as::<_, Product>(
                "SELECT id, sku, name, category_id, price_cents, taxable, loyalty_eligible, \
                 track_inventory, quantity_on_hand, is_active, created_at, updated_at \
                 FROM products WHERE id = ?1",
            )
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| SettlementError::at(SettlementStep::Inventory)(DbError::from(e)))?
            .ok_or_else(|| {
                SettlementError::at(SettlementStep::Inventory)(DbError::not_found(
                    "Product",
                    product_id,
                ))
            })?;

            if product.track_inventory {
                catalog
                    .decrement_stock(&mut tx, &product.id, item.quantity)
                    .await
                    .map_err(SettlementError::at(SettlementStep::Inventory))?;
            }
            line_products.push((item, Some(product)));
        }

        // ---- 5. Customer stats + loyalty ----
        let mut ledger_entries = Vec::new();

        if let Some(customer_id) = draft.customer_id.as_deref() {
            let customers = self.db.customers();

            customers
                .record_visit(&mut tx, customer_id, draft.total_cents)
                .await
                .map_err(SettlementError::at(SettlementStep::Loyalty))?;

            if self.config.loyalty_enabled {
                let mut points_redeemed = 0;

                // (a) Redeem: clamped at zero; ledger row describes the
                //     dollar value the points offset.
                if let Some(redemption) = redemption {
                    let (redeemed, balance) = customers
                        .redeem_points(&mut tx, customer_id, redemption.points)
                        .await
                        .map_err(SettlementError::at(SettlementStep::Loyalty))?;

                    if redeemed > 0 {
                        let value =
                            Money::from_cents(self.config.redemption_value_cents(redeemed));
                        let entry = new_ledger_entry(
                            customer_id,
                            Some(&transaction_id),
                            LedgerAction::Redeemed,
                            -redeemed,
                            balance,
                            format!("Redeemed {redeemed} points ({value} off)"),
                        );
                        customers
                            .append_ledger(&mut tx, &entry)
                            .await
                            .map_err(SettlementError::at(SettlementStep::Loyalty))?;
                        ledger_entries.push(entry);
                        points_redeemed = redeemed;
                    }
                }

                // (b) Earnable spend: gross line totals, excluding lines
                //     whose product is flagged non-eligible or whose SKU
                //     is configured out.
                let earnable_cents: i64 = line_products
                    .iter()
                    .filter(|(_, product)| match product {
                        Some(p) => p.loyalty_eligible && !self.config.is_sku_excluded(&p.sku),
                        None => true, // service lines always accrue
                    })
                    .map(|(item, _)| item.line_total_cents())
                    .sum();

                // (c) Earn: floor(earnable * rate); zero earns no row.
                let points_earned = self.config.points_for_spend(earnable_cents);
                if points_earned > 0 {
                    let balance = customers
                        .add_points(&mut tx, customer_id, points_earned)
                        .await
                        .map_err(SettlementError::at(SettlementStep::Loyalty))?;

                    let spend = Money::from_cents(earnable_cents);
                    let entry = new_ledger_entry(
                        customer_id,
                        Some(&transaction_id),
                        LedgerAction::Earned,
                        points_earned,
                        balance,
                        format!("Earned {points_earned} points on {spend}"),
                    );
                    customers
                        .append_ledger(&mut tx, &entry)
                        .await
                        .map_err(SettlementError::at(SettlementStep::Loyalty))?;
                    ledger_entries.push(entry);
                }

                if points_earned > 0 || points_redeemed > 0 {
                    transactions
                        .set_loyalty_outcome(&mut tx, &transaction_id, points_earned, points_redeemed)
                        .await
                        .map_err(SettlementError::at(SettlementStep::Loyalty))?;
                }
                transaction.loyalty_points_earned = points_earned;
                transaction.loyalty_points_redeemed = points_redeemed;
            }
        }

        // ---- 6. Coupon + campaign attribution ----
        if let Some(coupon) = coupon {
            let coupons = self.db.coupons();

            coupons
                .consume_use(&mut tx, &coupon.id, &coupon.code)
                .await
                .map_err(SettlementError::at(SettlementStep::Attribution))?;

            if let Some(campaign_id) = coupon.campaign_id.as_deref() {
                coupons
                    .attribute_campaign(&mut tx, campaign_id, draft.total_cents)
                    .await
                    .map_err(SettlementError::at(SettlementStep::Attribution))?;
            }
        }

        // ---- Commit ----
        tx.commit()
            .await
            .map_err(|e| SettlementError::at(SettlementStep::Commit)(DbError::from(e)))?;

        info!(
            transaction_id = %transaction_id,
            total = transaction.total_cents,
            discount = transaction.discount_cents,
            points_earned = transaction.loyalty_points_earned,
            points_redeemed = transaction.loyalty_points_redeemed,
            "Settlement committed"
        );

        Ok(SettlementOutcome {
            transaction,
            ledger_entries,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
