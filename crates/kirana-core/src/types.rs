//! # Domain Types
//!
//! Core domain types shared by the storage layer and its callers.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            Tenant                                       │
//! │       owns ─────────────────┬──────────────┬──────────────┐            │
//! │                             ▼              ▼              ▼            │
//! │  ┌─────────────────┐  ┌─────────────┐  ┌───────────┐  ┌────────────┐   │
//! │  │    Product      │  │  Customer   │  │   Bill    │  │   Staff    │   │
//! │  │  current_stock  │  │  balance    │  │  totals   │  │            │   │
//! │  └───────┬─────────┘  └─────┬───────┘  └─────┬─────┘  └────────────┘   │
//! │          │ referenced by    │ owns           │ owns                    │
//! │          ▼                  ▼                ▼                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────┐            │
//! │  │ StockMovement   │  │ CustomerPayment │  │  BillItem   │            │
//! │  │ (append-only)   │  │                 │  │ (immutable) │            │
//! │  └─────────────────┘  └─────────────────┘  └─────────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity except `Tenant` carries a `tenant_id`; cross-tenant
//! references are rejected by the storage layer at write time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::{Money, TaxRate};

// =============================================================================
// Identifiers
// =============================================================================

/// Tenant primary key.
pub type TenantId = i64;
/// Category primary key.
pub type CategoryId = i64;
/// Product primary key.
pub type ProductId = i64;
/// Customer primary key.
pub type CustomerId = i64;
/// Staff primary key.
pub type StaffId = i64;
/// Bill primary key.
pub type BillId = i64;

// =============================================================================
// Tenant & Staff
// =============================================================================

/// An isolated client organization; the unit of data partitioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Tenant {
    pub id: TenantId,
    pub business_name: String,
    /// Free-form lifecycle status ("active", "suspended", ...).
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// A member of staff who can be recorded as the creator of a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Staff {
    pub id: StaffId,
    pub tenant_id: TenantId,
    pub name: String,
    pub position: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// Whether a product or category is offered for sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

/// A tenant-scoped grouping of products. Names are unique per tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: CategoryId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
}

/// A product in a tenant's catalog.
///
/// `current_stock` is the authoritative on-hand quantity. It is changed only
/// by sales and recorded stock adjustments, never by catalog edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: ProductId,
    pub tenant_id: TenantId,
    /// Always a category of the same tenant.
    pub category_id: Option<CategoryId>,
    /// Stock Keeping Unit, unique within the tenant.
    pub sku: String,
    pub name: String,
    pub brand: Option<String>,
    /// Unit of measurement (pcs, box, kg, litre, ...).
    pub unit: String,
    pub purchase_price_cents: i64,
    pub selling_price_cents: i64,
    /// Maximum retail price printed on the pack, if any.
    pub mrp_cents: Option<i64>,
    /// GST rate in basis points (1800 = 18%).
    pub gst_bps: u32,
    pub current_stock: i64,
    /// Stock level at or below which the product is reported as low.
    pub low_stock_alert: i64,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as Money.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Returns the purchase price as Money.
    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    /// Returns the GST rate.
    #[inline]
    pub fn gst_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.gst_bps)
    }

    /// Checks whether `quantity` units can be taken from stock.
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        quantity >= 1 && self.current_stock >= quantity
    }

    /// True when stock has fallen to the alert threshold.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.low_stock_alert
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub category_id: Option<CategoryId>,
    pub sku: String,
    pub name: String,
    pub brand: Option<String>,
    pub unit: String,
    pub purchase_price: Money,
    pub selling_price: Money,
    pub mrp: Option<Money>,
    pub gst: TaxRate,
    /// Quantity on hand when the product is created; recorded as an `IN`
    /// movement so the ledger alone explains the counter.
    pub opening_stock: i64,
    pub low_stock_alert: i64,
}

impl NewProduct {
    /// Starts a product with the required fields and catalog defaults.
    pub fn new(sku: impl Into<String>, name: impl Into<String>, selling_price: Money) -> Self {
        NewProduct {
            category_id: None,
            sku: sku.into(),
            name: name.into(),
            brand: None,
            unit: "pcs".to_string(),
            purchase_price: Money::zero(),
            selling_price,
            mrp: None,
            gst: TaxRate::zero(),
            opening_stock: 0,
            low_stock_alert: 0,
        }
    }

    /// Files the product under a category of the same tenant.
    pub fn in_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Sets the GST rate.
    pub fn gst(mut self, gst: TaxRate) -> Self {
        self.gst = gst;
        self
    }

    /// Sets the opening stock.
    pub fn opening_stock(mut self, qty: i64) -> Self {
        self.opening_stock = qty;
        self
    }

    /// Sets the purchase price.
    pub fn purchase_price(mut self, price: Money) -> Self {
        self.purchase_price = price;
        self
    }

    /// Sets the low stock threshold.
    pub fn low_stock_alert(mut self, qty: i64) -> Self {
        self.low_stock_alert = qty;
        self
    }
}

/// Editable catalog fields of a product. Stock is deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetails {
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub brand: Option<String>,
    pub unit: String,
    pub purchase_price: Money,
    pub selling_price: Money,
    pub mrp: Option<Money>,
    pub gst: TaxRate,
    pub low_stock_alert: i64,
    pub status: ProductStatus,
}

impl From<&Product> for ProductDetails {
    fn from(p: &Product) -> Self {
        ProductDetails {
            category_id: p.category_id,
            name: p.name.clone(),
            brand: p.brand.clone(),
            unit: p.unit.clone(),
            purchase_price: p.purchase_price(),
            selling_price: p.selling_price(),
            mrp: p.mrp_cents.map(Money::from_cents),
            gst: p.gst_rate(),
            low_stock_alert: p.low_stock_alert,
            status: p.status,
        }
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Kind of stock movement.
///
/// `In` and `Return` add to stock, `Out` and `Sale` take from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    In,
    Out,
    Sale,
    Return,
}

impl MovementType {
    /// Returns +1 for inbound movements and -1 for outbound ones.
    #[inline]
    pub const fn sign(&self) -> i64 {
        match self {
            MovementType::In | MovementType::Return => 1,
            MovementType::Out | MovementType::Sale => -1,
        }
    }

    /// Signed effect of `quantity` units of this movement on stock.
    #[inline]
    pub const fn signed(&self, quantity: i64) -> i64 {
        self.sign() * quantity
    }

    /// Database / wire representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Sale => "SALE",
            MovementType::Return => "RETURN",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable stock-ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: i64,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub movement_type: MovementType,
    /// Always positive; direction comes from `movement_type`.
    pub quantity: i64,
    /// "Bill", "Manual Stock Add", "Opening Stock", ...
    pub reference_type: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Signed effect of this movement on the product's stock.
    #[inline]
    pub fn signed_quantity(&self) -> i64 {
        self.movement_type.signed(self.quantity)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer with a running spending/credit balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: CustomerId,
    pub tenant_id: TenantId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gst_number: Option<String>,
    /// Customer category ("Regular", "Wholesale", ...).
    pub kind: String,
    /// What the customer owes the business. Grows with credit sales,
    /// shrinks with repayments.
    pub spending_balance_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Returns the spending balance as Money.
    #[inline]
    pub fn spending_balance(&self) -> Money {
        Money::from_cents(self.spending_balance_cents)
    }
}

/// Input for creating or editing a customer. The balance is not editable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gst_number: Option<String>,
    pub kind: String,
}

impl CustomerDetails {
    /// A "Regular" customer with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        CustomerDetails {
            name: name.into(),
            phone: None,
            email: None,
            gst_number: None,
            kind: "Regular".to_string(),
        }
    }

    /// Sets the phone number.
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Direction of a customer payment.
///
/// `Credit` is money received from the customer and reduces what they owe.
/// `Debit` increases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentKind {
    Credit,
    Debit,
}

impl PaymentKind {
    /// Change applied to the customer's spending balance for `amount`.
    pub fn balance_delta(&self, amount: Money) -> Money {
        match self {
            PaymentKind::Credit => -amount,
            PaymentKind::Debit => amount,
        }
    }
}

impl FromStr for PaymentKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREDIT" => Ok(PaymentKind::Credit),
            "DEBIT" => Ok(PaymentKind::Debit),
            _ => Err(ValidationError::NotAllowed {
                field: "payment kind".to_string(),
                allowed: vec!["CREDIT".to_string(), "DEBIT".to_string()],
            }),
        }
    }
}

/// A ledger entry recording money moved against a customer's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CustomerPayment {
    pub id: i64,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub amount_cents: i64,
    pub kind: PaymentKind,
    pub created_at: DateTime<Utc>,
}

impl CustomerPayment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Bill
// =============================================================================

/// How a bill was settled at the till.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Cash,
    Card,
    Upi,
    /// Sold on account; the grand total is added to the customer's balance.
    Credit,
}

impl PaymentType {
    /// True for the credit designation.
    #[inline]
    pub const fn is_credit(&self) -> bool {
        matches!(self, PaymentType::Credit)
    }
}

impl FromStr for PaymentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentType::Cash),
            "card" => Ok(PaymentType::Card),
            "upi" => Ok(PaymentType::Upi),
            "credit" => Ok(PaymentType::Credit),
            _ => Err(ValidationError::NotAllowed {
                field: "payment type".to_string(),
                allowed: ["cash", "card", "upi", "credit"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

/// One sale transaction.
///
/// The three totals are derived from the bill's items and never authored
/// directly: `grand_total = item_total + gst_total - bill_discount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Bill {
    pub id: BillId,
    pub tenant_id: TenantId,
    pub customer_id: Option<CustomerId>,
    pub created_by: Option<StaffId>,
    pub item_total_cents: i64,
    pub bill_discount_cents: i64,
    pub gst_total_cents: i64,
    pub grand_total_cents: i64,
    pub payment_type: PaymentType,
    pub created_at: DateTime<Utc>,
}

impl Bill {
    pub fn item_total(&self) -> Money {
        Money::from_cents(self.item_total_cents)
    }

    pub fn bill_discount(&self) -> Money {
        Money::from_cents(self.bill_discount_cents)
    }

    pub fn gst_total(&self) -> Money {
        Money::from_cents(self.gst_total_cents)
    }

    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }
}

/// One line of a bill. Immutable once written.
///
/// Price, discount and GST rate are frozen at the time of sale so later
/// catalog edits never rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BillItem {
    pub id: i64,
    pub bill_id: BillId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub price_cents: i64,
    /// Discount per unit.
    pub discount_cents: i64,
    /// `(price - discount) * quantity`
    pub subtotal_cents: i64,
    pub gst_bps: u32,
}

impl BillItem {
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    pub fn gst_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.gst_bps)
    }
}

/// A bill together with its lines, as returned by the billing engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillWithItems {
    pub bill: Bill,
    pub items: Vec<BillItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================
