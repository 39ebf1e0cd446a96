//! # kirana-core: Pure Business Logic for Kirana
//!
//! This crate holds the retail rules that do not need a database: money
//! arithmetic, GST, bill totals, stock-ledger arithmetic and input
//! validation. Everything here is deterministic and free of I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Kirana Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │         External API layer (auth, tenant resolution, HTTP)      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ tenant id + request                    │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │     kirana-db: BillingEngine, StockLedger, repositories         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ pure calls                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kirana-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐   │   │
//! │  │   │   types   │  │   money   │  │  billing  │  │  ledger   │   │   │
//! │  │   │  Product  │  │   Money   │  │ SaleLine  │  │ Movement  │   │   │
//! │  │   │   Bill    │  │  TaxRate  │  │  Totals   │  │ arithmetic│   │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Product, Bill, StockMovement, Customer, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`billing`] - Sale requests, line pricing and bill totals
//! - [`ledger`] - Signed stock movements and reconciliation
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use kirana_core::billing::{BillTotals, PricedLine};
//! use kirana_core::{Money, TaxRate};
//!
//! let lines = [
//!     PricedLine::new(Money::from_major(100), Money::zero(), 2, TaxRate::from_bps(1800)),
//!     PricedLine::new(Money::from_major(50), Money::from_major(5), 1, TaxRate::zero()),
//! ];
//! let totals = BillTotals::compute(&lines, Money::from_major(10)).unwrap();
//!
//! assert_eq!(totals.item_total, Money::from_major(245));
//! assert_eq!(totals.gst_total, Money::from_major(36));
//! assert_eq!(totals.grand_total, Money::from_major(271));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod ledger;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use billing::{BillTotals, PricedLine, SaleLine, SaleRequest};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::StockReconciliation;
pub use money::{Money, TaxRate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines accepted in a single bill.
pub const MAX_BILL_LINES: usize = 200;

/// Maximum quantity of a single line.
///
/// Guards against keying errors (10000 instead of 10) on the till.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Highest unit price (catalog or override) and per-unit discount accepted.
///
/// With [`MAX_LINE_QUANTITY`] and [`MAX_BILL_LINES`] this keeps every bill
/// total well inside `i64` cents.
pub const MAX_UNIT_PRICE: Money = Money::from_major(10_000_000);

/// Largest single customer payment accepted.
pub const MAX_PAYMENT_AMOUNT: Money = Money::from_major(100_000_000_000);

/// Reference type written on movements produced by a sale.
pub const REFERENCE_BILL: &str = "Bill";

/// Reference type written on movements produced by a manual stock-in.
pub const REFERENCE_MANUAL_ADD: &str = "Manual Stock Add";

/// Reference type written on movements produced by a manual stock-out.
pub const REFERENCE_MANUAL_DEDUCTION: &str = "Manual Stock Deduction";

/// Reference type written on movements produced by a customer return.
pub const REFERENCE_RETURN: &str = "Customer Return";

/// Reference type written on the movement created with a new product.
pub const REFERENCE_OPENING_STOCK: &str = "Opening Stock";
