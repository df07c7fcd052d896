//! # Transaction Repository
//!
//! Database operations for transaction headers, line items, and payments.
//!
//! All inserts run on the settlement pipeline's transaction; the rows are
//! immutable after commit. The single post-insert write
//! (`set_loyalty_outcome`) happens inside the same database transaction
//! that created the header, so readers never observe it half-applied.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use checkout_core::{Payment, Transaction, TransactionItem};

/// Repository for transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    // =========================================================================
    // Settlement-scoped inserts (run on the pipeline's transaction)
    // =========================================================================

    /// Inserts the transaction header.
    pub async fn insert_header(
        &self,
        conn: &mut SqliteConnection,
        transaction: &Transaction,
    ) -> DbResult<()> {
        debug!(id = %transaction.id, total = %transaction.total_cents, "Inserting transaction header");

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, customer_id, coupon_id, status,
                subtotal_cents, tax_cents, tip_cents, discount_cents,
                loyalty_discount_cents, total_cents, payment_method,
                loyalty_points_earned, loyalty_points_redeemed, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.customer_id)
        .bind(&transaction.coupon_id)
        .bind(transaction.status)
        .bind(transaction.subtotal_cents)
        .bind(transaction.tax_cents)
        .bind(transaction.tip_cents)
        .bind(transaction.discount_cents)
        .bind(transaction.loyalty_discount_cents)
        .bind(transaction.total_cents)
        .bind(transaction.payment_method)
        .bind(transaction.loyalty_points_earned)
        .bind(transaction.loyalty_points_redeemed)
        .bind(transaction.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts a line item.
    ///
    /// ## Snapshot Pattern
    /// Item details (name, unit price, category, tax flag) are frozen on
    /// the row so history survives later catalog edits.
    pub async fn insert_item(
        &self,
        conn: &mut SqliteConnection,
        item: &TransactionItem,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transaction_items (
                id, transaction_id, item_type, product_id, service_id,
                category_id, name_snapshot, unit_price_cents, quantity,
                line_total_cents, taxable, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&item.id)
        .bind(&item.transaction_id)
        .bind(item.item_type)
        .bind(&item.product_id)
        .bind(&item.service_id)
        .bind(&item.category_id)
        .bind(&item.name_snapshot)
        .bind(item.unit_price_cents)
        .bind(item.quantity)
        .bind(item.line_total_cents)
        .bind(item.taxable)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts a payment row.
    pub async fn insert_payment(
        &self,
        conn: &mut SqliteConnection,
        payment: &Payment,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, transaction_id, method, amount_cents, tip_cents,
                net_tip_cents, reference, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.transaction_id)
        .bind(payment.method)
        .bind(payment.amount_cents)
        .bind(payment.tip_cents)
        .bind(payment.net_tip_cents)
        .bind(&payment.reference)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Records the loyalty outcome back onto the header.
    ///
    /// Runs inside the same database transaction that inserted the
    /// header; after commit the header is never touched again.
    pub async fn set_loyalty_outcome(
        &self,
        conn: &mut SqliteConnection,
        transaction_id: &str,
        points_earned: i64,
        points_redeemed: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET loyalty_points_earned = ?2,
                loyalty_points_redeemed = ?3
            WHERE id = ?1
            "#,
        )
        .bind(transaction_id)
        .bind(points_earned)
        .bind(points_redeemed)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction", transaction_id));
        }

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a transaction header by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, customer_id, coupon_id, status,
                   subtotal_cents, tax_cents, tip_cents, discount_cents,
                   loyalty_discount_cents, total_cents, payment_method,
                   loyalty_points_earned, loyalty_points_redeemed, created_at
            FROM transactions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    /// Gets all line items for a transaction.
    pub async fn items_for(&self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let items = sqlx::query_as::<_, TransactionItem>(
            r#"
            SELECT id, transaction_id, item_type, product_id, service_id,
                   category_id, name_snapshot, unit_price_cents, quantity,
                   line_total_cents, taxable, created_at
            FROM transaction_items
            WHERE transaction_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets all payments for a transaction.
    pub async fn payments_for(&self, transaction_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, transaction_id, method, amount_cents, tip_cents,
                   net_tip_cents, reference, created_at
            FROM payments
            WHERE transaction_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}

/// Generates a new transaction ID.
pub fn generate_transaction_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new transaction item ID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new payment ID.
pub fn generate_payment_id() -> String {
    Uuid::new_v4().to_string()
}
