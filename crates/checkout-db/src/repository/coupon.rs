//! # Coupon Repository
//!
//! Database operations for coupons, their reward rules, and campaign
//! attribution.
//!
//! ## Use-Count Ceiling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  use_count must never exceed max_uses. Check-and-increment is ONE      │
//! │  conditional statement, not read-then-write:                           │
//! │                                                                         │
//! │     UPDATE coupons SET use_count = use_count + 1                       │
//! │     WHERE id = ?                                                        │
//! │       AND (max_uses IS NULL OR use_count < max_uses)                   │
//! │       AND (is_single_use = 0 OR use_count < 1)                         │
//! │                                                                         │
//! │  Zero rows affected ⇒ the coupon is exhausted; the settlement step     │
//! │  fails and the whole checkout rolls back. Two concurrent checkouts    │
//! │  racing for the last redemption serialize into one success and one    │
//! │  rejection.                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use checkout_core::{Campaign, ConditionLogic, Coupon, CouponReward, CouponStatus, TagMatchMode};

/// Database row for a coupon; the four required-ids columns and
/// `customer_tags` are JSON text.
#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: String,
    code: String,
    status: CouponStatus,
    auto_apply: bool,
    customer_id: Option<String>,
    customer_tags: String,
    tag_match_mode: TagMatchMode,
    target_customer_type: Option<String>,
    condition_logic: ConditionLogic,
    requires_product_ids: String,
    requires_service_ids: String,
    requires_product_category_ids: String,
    requires_service_category_ids: String,
    min_purchase_cents: Option<i64>,
    max_customer_visits: Option<i64>,
    is_single_use: bool,
    use_count: i64,
    max_uses: Option<i64>,
    expires_at: Option<DateTime<Utc>>,
    campaign_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CouponRow {
    fn into_coupon(self, rewards: Vec<CouponReward>) -> DbResult<Coupon> {
        Ok(Coupon {
            id: self.id,
            code: self.code,
            status: self.status,
            auto_apply: self.auto_apply,
            customer_id: self.customer_id,
            customer_tags: serde_json::from_str(&self.customer_tags)?,
            tag_match_mode: self.tag_match_mode,
            target_customer_type: self.target_customer_type,
            condition_logic: self.condition_logic,
            requires_product_ids: serde_json::from_str(&self.requires_product_ids)?,
            requires_service_ids: serde_json::from_str(&self.requires_service_ids)?,
            requires_product_category_ids: serde_json::from_str(
                &self.requires_product_category_ids,
            )?,
            requires_service_category_ids: serde_json::from_str(
                &self.requires_service_category_ids,
            )?,
            min_purchase_cents: self.min_purchase_cents,
            max_customer_visits: self.max_customer_visits,
            is_single_use: self.is_single_use,
            use_count: self.use_count,
            max_uses: self.max_uses,
            expires_at: self.expires_at,
            campaign_id: self.campaign_id,
            rewards,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// All coupon columns, in struct order.
const COUPON_COLUMNS: &str = "id, code, status, auto_apply, customer_id, customer_tags, \
     tag_match_mode, target_customer_type, condition_logic, requires_product_ids, \
     requires_service_ids, requires_product_category_ids, requires_service_category_ids, \
     min_purchase_cents, max_customer_visits, is_single_use, use_count, max_uses, \
     expires_at, campaign_id, created_at, updated_at";

/// Repository for coupon and campaign database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Gets a coupon (with its rewards) by redemption code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let rewards = self.rewards_for(&row.id).await?;
                Ok(Some(row.into_coupon(rewards)?))
            }
            None => Ok(None),
        }
    }

    /// Gets a coupon (with its rewards) by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let rewards = self.rewards_for(&row.id).await?;
                Ok(Some(row.into_coupon(rewards)?))
            }
            None => Ok(None),
        }
    }

    /// Lists active auto-apply coupons for best-discount selection.
    pub async fn list_auto_apply(&self) -> DbResult<Vec<Coupon>> {
        let rows = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons
             WHERE auto_apply = 1 AND status = 'active'
             ORDER BY code"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut coupons = Vec::with_capacity(rows.len());
        for row in rows {
            let rewards = self.rewards_for(&row.id).await?;
            coupons.push(row.into_coupon(rewards)?);
        }
        Ok(coupons)
    }

    /// Gets the reward rules for a coupon, stable order.
    async fn rewards_for(&self, coupon_id: &str) -> DbResult<Vec<CouponReward>> {
        let rewards = sqlx::query_as::<_, CouponReward>(
            r#"
            SELECT id, coupon_id, applies_to, discount_type, discount_value,
                   max_discount_cents, target_product_id, target_service_id,
                   target_product_category_id, target_service_category_id,
                   created_at
            FROM coupon_rewards
            WHERE coupon_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(coupon_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rewards)
    }

    /// Inserts a coupon and its rewards.
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        debug!(code = %coupon.code, rewards = coupon.rewards.len(), "Inserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, status, auto_apply, customer_id, customer_tags,
                tag_match_mode, target_customer_type, condition_logic,
                requires_product_ids, requires_service_ids,
                requires_product_category_ids, requires_service_category_ids,
                min_purchase_cents, max_customer_visits, is_single_use,
                use_count, max_uses, expires_at, campaign_id,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22
            )
            "#,
        )
        .bind(&coupon.id)
        .bind(&coupon.code)
        .bind(coupon.status)
        .bind(coupon.auto_apply)
        .bind(&coupon.customer_id)
        .bind(serde_json::to_string(&coupon.customer_tags)?)
        .bind(coupon.tag_match_mode)
        .bind(&coupon.target_customer_type)
        .bind(coupon.condition_logic)
        .bind(serde_json::to_string(&coupon.requires_product_ids)?)
        .bind(serde_json::to_string(&coupon.requires_service_ids)?)
        .bind(serde_json::to_string(&coupon.requires_product_category_ids)?)
        .bind(serde_json::to_string(&coupon.requires_service_category_ids)?)
        .bind(coupon.min_purchase_cents)
        .bind(coupon.max_customer_visits)
        .bind(coupon.is_single_use)
        .bind(coupon.use_count)
        .bind(coupon.max_uses)
        .bind(coupon.expires_at)
        .bind(&coupon.campaign_id)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await?;

        for reward in &coupon.rewards {
            sqlx::query(
                r#"
                INSERT INTO coupon_rewards (
                    id, coupon_id, applies_to, discount_type, discount_value,
                    max_discount_cents, target_product_id, target_service_id,
                    target_product_category_id, target_service_category_id,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&reward.id)
            .bind(&reward.coupon_id)
            .bind(reward.applies_to)
            .bind(reward.discount_type)
            .bind(reward.discount_value)
            .bind(reward.max_discount_cents)
            .bind(&reward.target_product_id)
            .bind(&reward.target_service_id)
            .bind(&reward.target_product_category_id)
            .bind(&reward.target_service_category_id)
            .bind(reward.created_at)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    // =========================================================================
    // Settlement-scoped mutations (run on the pipeline's transaction)
    // =========================================================================

    /// Atomically consumes one redemption, honoring the ceiling.
    ///
    /// Check-and-increment is a single conditional statement; zero rows
    /// affected means the coupon has no redemptions remaining (ceiling
    /// reached, or already used for single-use coupons) and surfaces as a
    /// conflict that aborts the settlement.
    pub async fn consume_use(
        &self,
        conn: &mut SqliteConnection,
        coupon_id: &str,
        code: &str,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET use_count = use_count + 1,
                updated_at = ?2
            WHERE id = ?1
              AND (max_uses IS NULL OR use_count < max_uses)
              AND (is_single_use = 0 OR use_count < 1)
            "#,
        )
        .bind(coupon_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            debug!(coupon_id = %coupon_id, "Use-count increment rejected");
            return Err(DbError::CouponExhausted {
                code: code.to_string(),
            });
        }

        Ok(())
    }

    /// Credits a campaign for one redemption: `redeemed_count + 1`,
    /// `revenue_attributed + total`. One atomic statement.
    pub async fn attribute_campaign(
        &self,
        conn: &mut SqliteConnection,
        campaign_id: &str,
        total_cents: i64,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET redeemed_count = redeemed_count + 1,
                revenue_attributed_cents = revenue_attributed_cents + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(campaign_id)
        .bind(total_cents)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Campaign", campaign_id));
        }

        Ok(())
    }

    // =========================================================================
    // Campaigns
    // =========================================================================

    /// Gets a campaign by ID.
    pub async fn get_campaign(&self, id: &str) -> DbResult<Option<Campaign>> {
        let campaign = sqlx::query_as::<_, Campaign>(
            r#"
            SELECT id, name, redeemed_count, revenue_attributed_cents,
                   created_at, updated_at
            FROM campaigns
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(campaign)
    }

    /// Inserts a campaign.
    pub async fn insert_campaign(&self, campaign: &Campaign) -> DbResult<()> {
        debug!(name = %campaign.name, "Inserting campaign");

        sqlx::query(
            r#"
            INSERT INTO campaigns (
                id, name, redeemed_count, revenue_attributed_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&campaign.id)
        .bind(&campaign.name)
        .bind(campaign.redeemed_count)
        .bind(campaign.revenue_attributed_cents)
        .bind(campaign.created_at)
        .bind(campaign.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use checkout_core::{DiscountType, RewardScope};

    fn coupon(code: &str, max_uses: Option<i64>, single_use: bool) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: format!("id-{code}"),
            code: code.to_string(),
            status: CouponStatus::Active,
            auto_apply: false,
            customer_id: None,
            customer_tags: vec!["vip".to_string()],
            tag_match_mode: TagMatchMode::Any,
            target_customer_type: None,
            condition_logic: ConditionLogic::And,
            requires_product_ids: vec!["p-wax".to_string()],
            requires_service_ids: vec![],
            requires_product_category_ids: vec![],
            requires_service_category_ids: vec![],
            min_purchase_cents: Some(5000),
            max_customer_visits: None,
            is_single_use: single_use,
            use_count: 0,
            max_uses,
            expires_at: None,
            campaign_id: None,
            rewards: vec![CouponReward {
                id: format!("r-{code}"),
                coupon_id: format!("id-{code}"),
                applies_to: RewardScope::Order,
                discount_type: DiscountType::Percentage,
                discount_value: 1000,
                max_discount_cents: Some(500),
                target_product_id: None,
                target_service_id: None,
                target_product_category_id: None,
                target_service_category_id: None,
                created_at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_by_code_roundtrips_lists() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coupons = db.coupons();

        coupons.insert(&coupon("SAVE10", Some(100), false)).await.unwrap();

        let found = coupons.get_by_code("SAVE10").await.unwrap().unwrap();
        assert_eq!(found.customer_tags, vec!["vip"]);
        assert_eq!(found.requires_product_ids, vec!["p-wax"]);
        assert_eq!(found.min_purchase_cents, Some(5000));
        assert_eq!(found.rewards.len(), 1);
        assert_eq!(found.rewards[0].discount_type, DiscountType::Percentage);
        assert_eq!(found.rewards[0].max_discount_cents, Some(500));

        assert!(coupons.get_by_code("MISSING").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_consume_use_respects_ceiling() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coupons = db.coupons();
        coupons.insert(&coupon("TWICE", Some(2), false)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();

        coupons.consume_use(&mut conn, "id-TWICE", "TWICE").await.unwrap();
        coupons.consume_use(&mut conn, "id-TWICE", "TWICE").await.unwrap();

        // Third redemption hits the ceiling
        let err = coupons
            .consume_use(&mut conn, "id-TWICE", "TWICE")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CouponExhausted { .. }));
        drop(conn);

        let after = coupons.get_by_id("id-TWICE").await.unwrap().unwrap();
        assert_eq!(after.use_count, 2);
    }

    #[tokio::test]
    async fn test_consume_use_single_use() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coupons = db.coupons();
        coupons.insert(&coupon("ONCE", None, true)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();

        coupons.consume_use(&mut conn, "id-ONCE", "ONCE").await.unwrap();
        let err = coupons
            .consume_use(&mut conn, "id-ONCE", "ONCE")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CouponExhausted { .. }));
    }

    #[tokio::test]
    async fn test_attribute_campaign() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coupons = db.coupons();

        let now = Utc::now();
        coupons
            .insert_campaign(&Campaign {
                id: "camp-1".to_string(),
                name: "Spring promo".to_string(),
                redeemed_count: 0,
                revenue_attributed_cents: 0,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        coupons.attribute_campaign(&mut conn, "camp-1", 7500).await.unwrap();
        drop(conn);

        let after = coupons.get_campaign("camp-1").await.unwrap().unwrap();
        assert_eq!(after.redeemed_count, 1);
        assert_eq!(after.revenue_attributed_cents, 7500);
    }

    #[tokio::test]
    async fn test_list_auto_apply_filters() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coupons = db.coupons();

        let mut auto = coupon("AUTO", None, false);
        auto.auto_apply = true;
        coupons.insert(&auto).await.unwrap();

        let manual = coupon("MANUAL", None, false);
        coupons.insert(&manual).await.unwrap();

        let mut disabled = coupon("OFF", None, false);
        disabled.auto_apply = true;
        disabled.status = CouponStatus::Disabled;
        coupons.insert(&disabled).await.unwrap();

        let listed = coupons.list_auto_apply().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].code, "AUTO");
    }
}
