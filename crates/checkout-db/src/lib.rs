//! # checkout-db: Database Layer for the Settlement & Rewards Engine
//!
//! This crate provides database access for the checkout engine. It uses
//! SQLite for storage with sqlx for async operations, and owns the
//! settlement pipeline: the one component of the engine with side
//! effects.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout Data Flow                               │
//! │                                                                         │
//! │  Caller (POS / booking checkout)                                       │
//! │       │  evaluate_coupon (pure, checkout-core)                          │
//! │       │  settle (here)                                                  │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    checkout-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │   │  Repositories  │   │  Settlement  │   │   │
//! │  │   │   (pool.rs)   │◄──│ catalog        │◄──│  Pipeline    │   │   │
//! │  │   │               │   │ customer       │   │ (one atomic  │   │   │
//! │  │   │ SqlitePool    │   │ coupon         │   │  transaction │   │   │
//! │  │   │ WAL mode      │   │ transaction    │   │ per checkout)│   │   │
//! │  │   └───────────────┘   └────────────────┘   └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │                     SQLite Database (WAL)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and settlement error types
//! - [`repository`] - Repository implementations
//! - [`settlement`] - The settlement pipeline
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_db::{Database, DbConfig, SettlementPipeline};
//! use checkout_core::CheckoutConfig;
//!
//! let db = Database::new(DbConfig::new("path/to/checkout.db")).await?;
//! let pipeline = SettlementPipeline::new(db.clone(), CheckoutConfig::new());
//!
//! let outcome = pipeline.settle(&draft, &cart, coupon.as_ref(), None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod settlement;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, SettlementError, SettlementStep};
pub use pool::{Database, DbConfig};
pub use settlement::{SettlementOutcome, SettlementPipeline};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::coupon::CouponRepository;
pub use repository::customer::CustomerRepository;
pub use repository::transaction::TransactionRepository;
