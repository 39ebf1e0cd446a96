//! # kirana-db: Storage and Services for Kirana
//!
//! SQLite storage for the multi-tenant billing and stock ledger, and the
//! services that mutate it: the billing engine, the stock ledger and the
//! customer ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kirana Data Flow                                 │
//! │                                                                         │
//! │  API layer (auth + tenant resolution, outside this workspace)          │
//! │       │ tenant_id, request                                              │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kirana-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │ BillingEngine │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ StockLedger   │    │  (embedded)  │  │   │
//! │  │   │               │    │ Repositories  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│               │    │ 001_init.sql │  │   │
//! │  │   │ WriteTx       │    │ kirana-core   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and repository access
//! - [`transaction`] - `BEGIN IMMEDIATE` write transactions
//! - [`billing`] - The sale transaction
//! - [`repository`] - Tenant-scoped repositories and the stock ledger
//! - [`config`] - TOML + environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Error types and error kinds
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kirana_db::{Database, KiranaConfig};
//! use kirana_core::{PaymentType, SaleLine, SaleRequest};
//!
//! let config = KiranaConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let sale = db
//!     .billing()
//!     .create_sale(tenant_id, Some(cashier_id), SaleRequest::new(PaymentType::Cash, vec![SaleLine::new(42, 2)]))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod transaction;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use billing::BillingEngine;
pub use config::{ConfigError, KiranaConfig};
pub use error::{DbError, DbResult, ErrorKind, LedgerError, LedgerResult};
pub use pool::{Database, DbConfig};
pub use transaction::WriteTx;

// Repository re-exports for convenience
pub use repository::bill::{BillFilter, BillRepository};
pub use repository::category::CategoryRepository;
pub use repository::customer::CustomerRepository;
pub use repository::product::ProductRepository;
pub use repository::stock::{MovementFilter, NewMovement, StockLedger};
pub use repository::tenant::{StaffRepository, TenantRepository};
