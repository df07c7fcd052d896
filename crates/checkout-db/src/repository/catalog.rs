//! # Catalog Repository
//!
//! Database operations for products and services, including the atomic
//! bounded stock decrement the settlement pipeline relies on.
//!
//! ## Stock Decrement Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read-then-write (lost-update hazard)                         │
//! │     let stock = SELECT quantity_on_hand ...;                           │
//! │     UPDATE products SET quantity_on_hand = {stock - qty} ...           │
//! │     A concurrent checkout can observe stale stock between the read     │
//! │     and the write and overshoot the floor.                             │
//! │                                                                         │
//! │  ✅ CORRECT: one conditional statement                                  │
//! │     UPDATE products                                                     │
//! │     SET quantity_on_hand = quantity_on_hand - ?qty                     │
//! │     WHERE id = ?id AND quantity_on_hand >= ?qty                        │
//! │                                                                         │
//! │  Zero rows affected ⇒ honoring the decrement would go below zero:      │
//! │  the step fails with InsufficientStock and the settlement rolls back.  │
//! │  Two concurrent checkouts against one unit of stock serialize into    │
//! │  exactly one success and one rejection; stock never goes negative.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use checkout_core::{Product, Service};

/// All product columns, in struct order.
const PRODUCT_COLUMNS: &str = "id, sku, name, category_id, price_cents, taxable, \
     loyalty_eligible, track_inventory, quantity_on_hand, is_active, created_at, updated_at";

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Gets a product by its ID.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its SKU (e.g., "WAX-100").
    pub async fn get_product_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert_product(&self, product: &Product) -> DbResult<()> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, category_id, price_cents, taxable,
                loyalty_eligible, track_inventory, quantity_on_hand,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.price_cents)
        .bind(product.taxable)
        .bind(product.loyalty_eligible)
        .bind(product.track_inventory)
        .bind(product.quantity_on_hand)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Atomically decrements stock with a floor of zero.
    ///
    /// This is the settlement pipeline's inventory step: one conditional
    /// statement per product row, executed on the pipeline's transaction.
    /// Zero rows affected means the decrement would take stock below zero
    /// (or the product vanished) and surfaces as a retryable conflict.
    pub async fn decrement_stock(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity_on_hand = quantity_on_hand - ?2,
                updated_at = ?3
            WHERE id = ?1 AND quantity_on_hand >= ?2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            debug!(product_id = %product_id, quantity = %quantity, "Stock decrement rejected");
            return Err(DbError::InsufficientStock {
                product_id: product_id.to_string(),
                requested: quantity,
            });
        }

        Ok(())
    }

    /// Adjusts stock by a delta (restocking, shrinkage corrections).
    ///
    /// Positive deltas are unconditional; use [`decrement_stock`] for
    /// sales, which must respect the floor.
    ///
    /// [`decrement_stock`]: CatalogRepository::decrement_stock
    pub async fn adjust_stock(&self, product_id: &str, delta: i64) -> DbResult<()> {
        debug!(product_id = %product_id, delta = %delta, "Adjusting stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity_on_hand = quantity_on_hand + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }

    // =========================================================================
    // Services
    // =========================================================================

    /// Gets a service by its ID.
    pub async fn get_service(&self, id: &str) -> DbResult<Option<Service>> {
        let service = sqlx::query_as::<_, Service>(
            r#"
            SELECT id, name, category_id, price_cents, taxable, is_active,
                   created_at, updated_at
            FROM services
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(service)
    }

    /// Inserts a new service.
    pub async fn insert_service(&self, service: &Service) -> DbResult<()> {
        debug!(name = %service.name, "Inserting service");

        sqlx::query(
            r#"
            INSERT INTO services (
                id, name, category_id, price_cents, taxable, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&service.id)
        .bind(&service.name)
        .bind(&service.category_id)
        .bind(service.price_cents)
        .bind(service.taxable)
        .bind(service.is_active)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count_products(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new catalog entity ID.
pub fn generate_catalog_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
