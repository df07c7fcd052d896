//! # Seed Data Generator
//!
//! Populates the database with demo catalog, customers, coupons, and a
//! campaign for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p checkout-db --bin seed
//!
//! # Specify database path
//! cargo run -p checkout-db --bin seed -- --db ./data/checkout.db
//! ```
//!
//! ## Generated Data
//! - Retail products across a few categories, with stock and a
//!   loyalty-excluded bottled water SKU
//! - Bookable services
//! - A handful of customers with tags and visit history
//! - A campaign plus coupons exercising targeting, conditions, and every
//!   reward shape (percentage with cap, flat, free)

use chrono::{Duration, Utc};
use std::env;
use uuid::Uuid;

use checkout_core::{
    Campaign, ConditionLogic, Coupon, CouponReward, CouponStatus, Customer, DiscountType, Product,
    RewardScope, Service, TagMatchMode,
};
use checkout_db::{Database, DbConfig};

/// Product seed rows: (sku, name, category, price_cents, stock, loyalty_eligible)
const PRODUCTS: &[(&str, &str, &str, i64, i64, bool)] = &[
    ("WAX-100", "Carnauba Wax 100ml", "retail", 1899, 40, true),
    ("POLISH-250", "Finishing Polish 250ml", "retail", 2499, 25, true),
    ("TOWEL-MF", "Microfiber Towel 3-pack", "retail", 1299, 60, true),
    ("SHAMPOO-1L", "Car Shampoo 1L", "retail", 1599, 30, true),
    ("AIR-PINE", "Pine Air Freshener", "impulse", 399, 120, true),
    // Bottled water never accrues loyalty points
    ("WATER-500", "Bottled Water 500ml", "impulse", 250, 200, false),
];

/// Service seed rows: (name, category, price_cents)
const SERVICES: &[(&str, &str, i64)] = &[
    ("Express Wash", "wash", 1500),
    ("Full Interior Detail", "detailing", 8000),
    ("Exterior Hand Wax", "detailing", 6500),
    ("Headlight Restoration", "restoration", 4500),
];

/// Customer seed rows: (name, tags, customer_type, visits, lifetime_cents, points)
const CUSTOMERS: &[(&str, &[&str], Option<&str>, i64, i64, i64)] = &[
    ("Avery Chen", &["vip"], Some("member"), 14, 92000, 340),
    ("Sam Okafor", &["fleet", "vip"], Some("member"), 32, 410000, 1250),
    ("Riley Park", &[], None, 1, 1500, 0),
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let db_path = parse_db_arg().unwrap_or_else(|| "./checkout.db".to_string());

    tracing::info!(path = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .expect("failed to open database");

    let now = Utc::now();
    let catalog = db.catalog();

    for (sku, name, category, price, stock, eligible) in PRODUCTS {
        catalog
            .insert_product(&Product {
                id: Uuid::new_v4().to_string(),
                sku: sku.to_string(),
                name: name.to_string(),
                category_id: Some(category.to_string()),
                price_cents: *price,
                taxable: true,
                loyalty_eligible: *eligible,
                track_inventory: true,
                quantity_on_hand: *stock,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("failed to insert product");
    }
    tracing::info!(count = PRODUCTS.len(), "Products seeded");

    let mut service_ids = Vec::new();
    for (name, category, price) in SERVICES {
        let id = Uuid::new_v4().to_string();
        catalog
            .insert_service(&Service {
                id: id.clone(),
                name: name.to_string(),
                category_id: Some(category.to_string()),
                price_cents: *price,
                taxable: true,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("failed to insert service");
        service_ids.push(id);
    }
    tracing::info!(count = SERVICES.len(), "Services seeded");

    let customers = db.customers();
    for (name, tags, customer_type, visits, lifetime, points) in CUSTOMERS {
        customers
            .insert(&Customer {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                customer_type: customer_type.map(|t| t.to_string()),
                visit_count: *visits,
                lifetime_spend_cents: *lifetime,
                loyalty_points_balance: *points,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("failed to insert customer");
    }
    tracing::info!(count = CUSTOMERS.len(), "Customers seeded");

    let coupons = db.coupons();
    let campaign_id = Uuid::new_v4().to_string();
    coupons
        .insert_campaign(&Campaign {
            id: campaign_id.clone(),
            name: "Spring Detailing Push".to_string(),
            redeemed_count: 0,
            revenue_attributed_cents: 0,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("failed to insert campaign");

    // 10% off the order, capped at $5, tied to the campaign
    let spring = base_coupon("SPRING10", &campaign_id, now);
    coupons.insert(&spring).await.expect("failed to insert coupon");

    // $20 minimum spend, VIP-only, free pine air freshener
    let mut vip = base_coupon("VIPFRESH", &campaign_id, now);
    vip.id = Uuid::new_v4().to_string();
    vip.customer_tags = vec!["vip".to_string()];
    vip.tag_match_mode = TagMatchMode::Any;
    vip.min_purchase_cents = Some(2000);
    vip.rewards = vec![CouponReward {
        id: Uuid::new_v4().to_string(),
        coupon_id: vip.id.clone(),
        applies_to: RewardScope::Product,
        discount_type: DiscountType::Free,
        discount_value: 0,
        max_discount_cents: None,
        target_product_id: None,
        target_service_id: None,
        target_product_category_id: Some("impulse".to_string()),
        target_service_category_id: None,
        created_at: now,
    }];
    coupons.insert(&vip).await.expect("failed to insert coupon");

    // Flat $10 off detailing services, auto-applied, single use, expiring
    let mut detail = base_coupon("DETAIL10", &campaign_id, now);
    detail.id = Uuid::new_v4().to_string();
    detail.auto_apply = true;
    detail.is_single_use = true;
    detail.campaign_id = None;
    detail.expires_at = Some(now + Duration::days(30));
    detail.requires_service_category_ids = vec!["detailing".to_string()];
    detail.rewards = vec![CouponReward {
        id: Uuid::new_v4().to_string(),
        coupon_id: detail.id.clone(),
        applies_to: RewardScope::Service,
        discount_type: DiscountType::Flat,
        discount_value: 1000,
        max_discount_cents: None,
        target_product_id: None,
        target_service_id: None,
        target_product_category_id: None,
        target_service_category_id: Some("detailing".to_string()),
        created_at: now,
    }];
    coupons.insert(&detail).await.expect("failed to insert coupon");

    tracing::info!(services = service_ids.len(), "Seed complete");
}

/// Builds the baseline 10%-capped-at-$5 campaign coupon.
fn base_coupon(code: &str, campaign_id: &str, now: chrono::DateTime<Utc>) -> Coupon {
    let id = Uuid::new_v4().to_string();
    Coupon {
        id: id.clone(),
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
        max_uses: Some(500),
        expires_at: None,
        campaign_id: Some(campaign_id.to_string()),
        rewards: vec![CouponReward {
            id: Uuid::new_v4().to_string(),
            coupon_id: id,
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

/// Parses `--db <path>` from the command line.
fn parse_db_arg() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|a| a == "--db")
        .and_then(|i| args.get(i + 1))
        .cloned()
}
