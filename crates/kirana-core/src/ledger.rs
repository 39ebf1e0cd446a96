//! # Stock Ledger Arithmetic
//!
//! Pure helpers over stock movements. The storage layer persists the
//! movements; this module decides what a movement does to a counter.
//!
//! ```text
//! current_stock == Σ signed(movement)      for every product, at all times
//!
//!   IN, RETURN   → +quantity
//!   OUT, SALE    → -quantity
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{MovementType, Product, ProductId, StockMovement};

/// Sum of the signed quantities of `movements`.
pub fn ledger_balance<'a, I>(movements: I) -> i64
where
    I: IntoIterator<Item = &'a StockMovement>,
{
    movements
        .into_iter()
        .map(StockMovement::signed_quantity)
        .sum()
}

/// The movement a manual adjustment of `delta` produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    pub movement_type: MovementType,
    /// Positive quantity written on the movement.
    pub quantity: i64,
    /// Stock after the adjustment.
    pub new_stock: i64,
}

/// Plans a manual stock adjustment of `product`.
///
/// A positive delta is an `IN`, a negative one an `OUT`. Zero is rejected,
/// and a delta that would leave stock below zero is `InsufficientStock`.
pub fn plan_adjustment(product: &Product, delta: i64) -> CoreResult<Adjustment> {
    if delta == 0 {
        return Err(ValidationError::MustBePositive {
            field: "adjustment".to_string(),
        }
        .into());
    }

    let new_stock = product
        .current_stock
        .checked_add(delta)
        .ok_or_else(|| CoreError::invalid("stock adjustment overflows"))?;

    if new_stock < 0 {
        return Err(CoreError::InsufficientStock {
            line: 0,
            product_id: product.id,
            sku: product.sku.clone(),
            available: product.current_stock,
            requested: -delta,
        });
    }

    let movement_type = if delta > 0 {
        MovementType::In
    } else {
        MovementType::Out
    };

    Ok(Adjustment {
        movement_type,
        quantity: delta.abs(),
        new_stock,
    })
}

/// Result of comparing a product's counter to its ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReconciliation {
    pub product_id: ProductId,
    pub current_stock: i64,
    pub ledger_balance: i64,
}

impl StockReconciliation {
    /// True when the counter equals the sum of signed movements.
    pub fn is_consistent(&self) -> bool {
        self.current_stock == self.ledger_balance
    }

    /// `current_stock - ledger_balance`; zero when consistent.
    pub fn drift(&self) -> i64 {
        self.current_stock - self.ledger_balance
    }
}
