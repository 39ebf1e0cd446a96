//! # Billing Calculations
//!
//! Sale requests, line pricing and bill totals.
//!
//! ## Bill Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per line:   subtotal = (price - discount_per_unit) × quantity          │
//! │              gst_num  = subtotal × gst_bps           (exact, i128)      │
//! │                                                                         │
//! │  per bill:   item_total  = Σ subtotal                                   │
//! │              gst_total   = round(Σ gst_num / 10 000)  (half away from 0)│
//! │              grand_total = item_total + gst_total - bill_discount       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! GST is rounded once per bill, not per line, so totals computed from the
//! request and totals recomputed from persisted items always agree.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, TaxRate};
use crate::types::{BillItem, CustomerId, PaymentType, ProductId};
use crate::{MAX_BILL_LINES, MAX_LINE_QUANTITY, MAX_UNIT_PRICE};

// =============================================================================
// Sale Request
// =============================================================================

/// One requested line of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Overrides the product's selling price when present.
    pub price: Option<Money>,
    /// Discount per unit; zero when absent.
    pub discount_per_unit: Option<Money>,
}

impl SaleLine {
    /// A line sold at the catalog price with no discount.
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        SaleLine {
            product_id,
            quantity,
            price: None,
            discount_per_unit: None,
        }
    }

    /// Sets an explicit unit price.
    pub fn at_price(mut self, price: Money) -> Self {
        self.price = Some(price);
        self
    }

    /// Sets a per-unit discount.
    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount_per_unit = Some(discount);
        self
    }
}

/// Input of the create-sale operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub customer_id: Option<CustomerId>,
    pub bill_discount: Money,
    pub payment_type: PaymentType,
    pub items: Vec<SaleLine>,
}

impl SaleRequest {
    /// A request with no customer and no bill discount.
    pub fn new(payment_type: PaymentType, items: Vec<SaleLine>) -> Self {
        SaleRequest {
            customer_id: None,
            bill_discount: Money::zero(),
            payment_type,
            items,
        }
    }

    /// Attaches a customer.
    pub fn for_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    /// Sets the bill-level discount.
    pub fn with_bill_discount(mut self, discount: Money) -> Self {
        self.bill_discount = discount;
        self
    }

    /// Checks everything that can be checked without reading the database.
    ///
    /// ## Rules
    /// - At least one line, at most [`MAX_BILL_LINES`]
    /// - `bill_discount >= 0`
    /// - Every line: `1 <= quantity <= MAX_LINE_QUANTITY`, explicit price
    ///   and discount between zero and [`MAX_UNIT_PRICE`]
    /// - A credit sale names a customer
    pub fn validate(&self) -> CoreResult<()> {
        if self.items.is_empty() {
            return Err(CoreError::invalid("a bill needs at least one item"));
        }

        if self.items.len() > MAX_BILL_LINES {
            return Err(CoreError::invalid(format!(
                "a bill accepts at most {} items, got {}",
                MAX_BILL_LINES,
                self.items.len()
            )));
        }

        if self.bill_discount.is_negative() {
            return Err(CoreError::invalid("bill discount must not be negative"));
        }

        if self.payment_type.is_credit() && self.customer_id.is_none() {
            return Err(CoreError::invalid("a credit sale requires a customer"));
        }

        for (line, item) in self.items.iter().enumerate() {
            if item.quantity < 1 {
                return Err(CoreError::invalid_line(line, "quantity must be at least 1"));
            }
            if item.quantity > MAX_LINE_QUANTITY {
                return Err(CoreError::invalid_line(
                    line,
                    format!("quantity must not exceed {}", MAX_LINE_QUANTITY),
                ));
            }
            if item.price.is_some_and(|p| p.is_negative()) {
                return Err(CoreError::invalid_line(line, "price must not be negative"));
            }
            if item.price.is_some_and(|p| p > MAX_UNIT_PRICE) {
                return Err(CoreError::invalid_line(
                    line,
                    format!("price must not exceed {}", MAX_UNIT_PRICE),
                ));
            }
            if item.discount_per_unit.is_some_and(|d| d.is_negative()) {
                return Err(CoreError::invalid_line(line, "discount must not be negative"));
            }
            if item.discount_per_unit.is_some_and(|d| d > MAX_UNIT_PRICE) {
                return Err(CoreError::invalid_line(
                    line,
                    format!("discount must not exceed {}", MAX_UNIT_PRICE),
                ));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Priced Line
// =============================================================================

/// A bill line with its price resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub price: Money,
    pub discount: Money,
    pub quantity: i64,
    pub gst: TaxRate,
}

impl PricedLine {
    pub fn new(price: Money, discount: Money, quantity: i64, gst: TaxRate) -> Self {
        PricedLine {
            price,
            discount,
            quantity,
            gst,
        }
    }

    /// Resolves a request line against the product's catalog price.
    ///
    /// Fails when the per-unit discount exceeds the unit price or the line
    /// subtotal does not fit in `Money`.
    pub fn resolve(
        line: usize,
        item: &SaleLine,
        catalog_price: Money,
        gst: TaxRate,
    ) -> CoreResult<Self> {
        let price = item.price.unwrap_or(catalog_price);
        let discount = item.discount_per_unit.unwrap_or_default();

        if discount > price {
            return Err(CoreError::invalid_line(
                line,
                format!("discount {} exceeds unit price {}", discount, price),
            ));
        }

        let priced = PricedLine::new(price, discount, item.quantity, gst);
        if priced.subtotal().is_err() {
            return Err(CoreError::invalid_line(line, "line amount is out of range"));
        }

        Ok(priced)
    }

    /// `(price - discount) × quantity`
    pub fn subtotal(&self) -> CoreResult<Money> {
        self.price
            .checked_sub(self.discount)
            .and_then(|unit| unit.checked_mul(self.quantity))
            .ok_or_else(|| CoreError::invalid("line amount is out of range"))
    }

    /// Unrounded GST of this line in cents / 10 000.
    pub fn gst_numerator(&self) -> CoreResult<i128> {
        Ok(self.gst.numerator(self.subtotal()?))
    }
}

impl From<&BillItem> for PricedLine {
    fn from(item: &BillItem) -> Self {
        PricedLine::new(item.price(), item.discount(), item.quantity, item.gst_rate())
    }
}

// =============================================================================
// Bill Totals
// =============================================================================

/// Derived totals of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BillTotals {
    pub item_total: Money,
    pub bill_discount: Money,
    pub gst_total: Money,
    pub grand_total: Money,
}

impl BillTotals {
    /// Computes totals for `lines` and a bill-level discount.
    ///
    /// Fails with `InvalidRequest` when any amount leaves the `i64` range.
    pub fn compute(lines: &[PricedLine], bill_discount: Money) -> CoreResult<Self> {
        let out_of_range = || CoreError::invalid("bill total is out of range");

        let mut item_total = Money::zero();
        let mut gst_numerator: i128 = 0;
        for line in lines {
            item_total = item_total.checked_add(line.subtotal()?).ok_or_else(out_of_range)?;
            gst_numerator = gst_numerator
                .checked_add(line.gst_numerator()?)
                .ok_or_else(out_of_range)?;
        }

        let gst_total = Money::checked_from_bps_numerator(gst_numerator).ok_or_else(out_of_range)?;
        let grand_total = item_total
            .checked_add(gst_total)
            .and_then(|gross| gross.checked_sub(bill_discount))
            .ok_or_else(out_of_range)?;

        Ok(BillTotals {
            item_total,
            bill_discount,
            gst_total,
            grand_total,
        })
    }

    /// Recomputes totals from persisted bill items.
    pub fn from_items(items: &[BillItem], bill_discount: Money) -> CoreResult<Self> {
        let lines: Vec<PricedLine> = items.iter().map(PricedLine::from).collect();
        BillTotals::compute(&lines, bill_discount)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
