//! # Customer Repository
//!
//! Database operations for customers: lifetime stats, the bounded loyalty
//! balance updates, and the append-only ledger.
//!
//! ## Balance Cache vs Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The ledger is the source of truth; customers.loyalty_points_balance   │
//! │  is a derived cache. Both are written inside the SAME settlement       │
//! │  transaction, and each ledger row's points_balance comes from the      │
//! │  balance UPDATE's RETURNING clause, so the snapshot cannot drift       │
//! │  from the cache.                                                       │
//! │                                                                         │
//! │  Redemption clamps at zero (spend only what is there); earning is an   │
//! │  unconditional add. Both are single statements.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use checkout_core::{Customer, LedgerAction, LoyaltyLedgerEntry};

/// Database row for a customer; `tags` is a JSON text column.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    tags: String,
    customer_type: Option<String>,
    visit_count: i64,
    lifetime_spend_cents: i64,
    loyalty_points_balance: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CustomerRow {
    fn into_customer(self) -> DbResult<Customer> {
        Ok(Customer {
            id: self.id,
            name: self.name,
            tags: serde_json::from_str(&self.tags)?,
            customer_type: self.customer_type,
            visit_count: self.visit_count,
            lifetime_spend_cents: self.lifetime_spend_cents,
            loyalty_points_balance: self.loyalty_points_balance,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            SELECT id, name, tags, customer_type, visit_count,
                   lifetime_spend_cents, loyalty_points_balance,
                   created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CustomerRow::into_customer).transpose()
    }

    /// Inserts a new customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        let tags = serde_json::to_string(&customer.tags)?;

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, tags, customer_type, visit_count,
                lifetime_spend_cents, loyalty_points_balance,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(tags)
        .bind(&customer.customer_type)
        .bind(customer.visit_count)
        .bind(customer.lifetime_spend_cents)
        .bind(customer.loyalty_points_balance)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Settlement-scoped mutations (run on the pipeline's transaction)
    // =========================================================================

    /// Records a completed visit: `visit_count + 1`,
    /// `lifetime_spend + total`. One atomic statement.
    pub async fn record_visit(
        &self,
        conn: &mut SqliteConnection,
        customer_id: &str,
        total_cents: i64,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE customers
            SET visit_count = visit_count + 1,
                lifetime_spend_cents = lifetime_spend_cents + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(customer_id)
        .bind(total_cents)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", customer_id));
        }

        Ok(())
    }

    /// Redeems up to `requested` points, clamping the balance at zero.
    ///
    /// The clamp lives in the statement itself
    /// (`MAX(loyalty_points_balance - ?, 0)`), so the write never depends
    /// on a previously read value. The pre-read only sizes the signed
    /// ledger delta; within the settlement transaction no other writer
    /// can interleave.
    ///
    /// ## Returns
    /// `(points_redeemed, new_balance)` - redeemed may be less than
    /// requested when the balance ran short.
    pub async fn redeem_points(
        &self,
        conn: &mut SqliteConnection,
        customer_id: &str,
        requested: i64,
    ) -> DbResult<(i64, i64)> {
        let before: Option<i64> =
            sqlx::query_scalar("SELECT loyalty_points_balance FROM customers WHERE id = ?1")
                .bind(customer_id)
                .fetch_optional(&mut *conn)
                .await?;
        let before = before.ok_or_else(|| DbError::not_found("Customer", customer_id))?;

        let now = Utc::now();
        let after: i64 = sqlx::query_scalar(
            r#"
            UPDATE customers
            SET loyalty_points_balance = MAX(loyalty_points_balance - ?2, 0),
                updated_at = ?3
            WHERE id = ?1
            RETURNING loyalty_points_balance
            "#,
        )
        .bind(customer_id)
        .bind(requested)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        let redeemed = before - after;
        debug!(customer_id = %customer_id, requested, redeemed, balance = after, "Points redeemed");

        Ok((redeemed, after))
    }

    /// Adds earned points to the balance. One atomic statement.
    ///
    /// ## Returns
    /// The new balance, for the ledger row's snapshot.
    pub async fn add_points(
        &self,
        conn: &mut SqliteConnection,
        customer_id: &str,
        points: i64,
    ) -> DbResult<i64> {
        let now = Utc::now();

        let after: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE customers
            SET loyalty_points_balance = loyalty_points_balance + ?2,
                updated_at = ?3
            WHERE id = ?1
            RETURNING loyalty_points_balance
            "#,
        )
        .bind(customer_id)
        .bind(points)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        after.ok_or_else(|| DbError::not_found("Customer", customer_id))
    }

    /// Appends a loyalty ledger row.
    ///
    /// `points_balance` must be the balance immediately after the change;
    /// callers take it from the balance update's RETURNING value.
    pub async fn append_ledger(
        &self,
        conn: &mut SqliteConnection,
        entry: &LoyaltyLedgerEntry,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO loyalty_ledger (
                id, customer_id, transaction_id, action,
                points_change, points_balance, description, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.customer_id)
        .bind(&entry.transaction_id)
        .bind(entry.action)
        .bind(entry.points_change)
        .bind(entry.points_balance)
        .bind(&entry.description)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a customer's full ledger, oldest first.
    ///
    /// Used by reconciliation: each row's balance must be the previous
    /// row's balance plus its change.
    pub async fn ledger_for_customer(
        &self,
        customer_id: &str,
    ) -> DbResult<Vec<LoyaltyLedgerEntry>> {
        let entries = sqlx::query_as::<_, LoyaltyLedgerEntry>(
            r#"
            SELECT id, customer_id, transaction_id, action,
                   points_change, points_balance, description, created_at
            FROM loyalty_ledger
            WHERE customer_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

/// Builds a ledger entry with a fresh ID.
pub fn new_ledger_entry(
    customer_id: &str,
    transaction_id: Option<&str>,
    action: LedgerAction,
    points_change: i64,
    points_balance: i64,
    description: String,
) -> LoyaltyLedgerEntry {
    LoyaltyLedgerEntry {
        id: Uuid::new_v4().to_string(),
        customer_id: customer_id.to_string(),
        transaction_id: transaction_id.map(|t| t.to_string()),
        action,
        points_change,
        points_balance,
        description,
        created_at: Utc::now(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn customer(id: &str, balance: i64) -> Customer {
        let now = Utc::now();
        Customer {
            id: id.to_string(),
            name: "Jordan".to_string(),
            tags: vec!["vip".to_string()],
            customer_type: Some("member".to_string()),
            visit_count: 2,
            lifetime_spend_cents: 10000,
            loyalty_points_balance: balance,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrips_tags() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customers = db.customers();

        customers.insert(&customer("cust-1", 50)).await.unwrap();

        let found = customers.get_by_id("cust-1").await.unwrap().unwrap();
        assert_eq!(found.tags, vec!["vip"]);
        assert_eq!(found.customer_type.as_deref(), Some("member"));
        assert_eq!(found.loyalty_points_balance, 50);
    }

    #[tokio::test]
    async fn test_record_visit() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customers = db.customers();
        customers.insert(&customer("cust-1", 0)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        customers.record_visit(&mut conn, "cust-1", 7500).await.unwrap();
        drop(conn);

        let after = customers.get_by_id("cust-1").await.unwrap().unwrap();
        assert_eq!(after.visit_count, 3);
        assert_eq!(after.lifetime_spend_cents, 17500);
    }

    #[tokio::test]
    async fn test_redeem_clamps_at_zero() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customers = db.customers();
        customers.insert(&customer("cust-1", 30)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();

        // Redeeming more than the balance spends only what is there
        let (redeemed, balance) = customers
            .redeem_points(&mut conn, "cust-1", 100)
            .await
            .unwrap();
        assert_eq!(redeemed, 30);
        assert_eq!(balance, 0);

        // A second redemption finds nothing to spend
        let (redeemed, balance) = customers
            .redeem_points(&mut conn, "cust-1", 10)
            .await
            .unwrap();
        assert_eq!(redeemed, 0);
        assert_eq!(balance, 0);
    }

    #[tokio::test]
    async fn test_add_points_returns_snapshot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customers = db.customers();
        customers.insert(&customer("cust-1", 10)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let balance = customers.add_points(&mut conn, "cust-1", 35).await.unwrap();
        assert_eq!(balance, 45);
    }

    #[tokio::test]
    async fn test_ledger_appends_in_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customers = db.customers();
        customers.insert(&customer("cust-1", 0)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let earn = new_ledger_entry(
            "cust-1",
            Some("txn-1"),
            LedgerAction::Earned,
            35,
            35,
            "Earned 35 points on $35.00".to_string(),
        );
        customers.append_ledger(&mut conn, &earn).await.unwrap();
        drop(conn);

        let ledger = customers.ledger_for_customer("cust-1").await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].action, LedgerAction::Earned);
        assert_eq!(ledger[0].points_balance, 35);
        assert_eq!(ledger[0].transaction_id.as_deref(), Some("txn-1"));
    }

    #[tokio::test]
    async fn test_missing_customer_errors() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customers = db.customers();

        let mut conn = db.pool().acquire().await.unwrap();
        let err = customers
            .record_visit(&mut conn, "ghost", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = customers
            .redeem_points(&mut conn, "ghost", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
