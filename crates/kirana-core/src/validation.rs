//! # Validation Module
//!
//! Input validation for catalog, customer and ledger writes.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: API layer (outside this workspace)                           │
//! │  └── Deserialization, authentication, tenant resolution                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE — business rule validation, before any write     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK (current_stock >= 0), CHECK (quantity > 0)                  │
//! │  ├── UNIQUE (tenant_id, sku)                                           │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kirana_core::validation::{validate_sku, validate_quantity};
//!
//! assert!(validate_sku("ATTA-10KG").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::{Money, TaxRate};
use crate::types::{CustomerDetails, NewProduct, ProductDetails};
use crate::{MAX_LINE_QUANTITY, MAX_PAYMENT_AMOUNT, MAX_UNIT_PRICE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
/// - Only alphanumeric characters, hyphens, underscores
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 100,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a required display name (product, customer, staff, tenant).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 255 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 255,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a non-negative amount (prices, discounts). Zero is allowed.
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a unit price: zero up to [`MAX_UNIT_PRICE`].
pub fn validate_price(field: &str, amount: Money) -> ValidationResult<()> {
    validate_non_negative(field, amount)?;

    if amount > MAX_UNIT_PRICE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_UNIT_PRICE.cents(),
        });
    }

    Ok(())
}

/// Validates a payment amount: strictly positive, at most [`MAX_PAYMENT_AMOUNT`].
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    if amount > MAX_PAYMENT_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: MAX_PAYMENT_AMOUNT.cents(),
        });
    }

    Ok(())
}

/// Validates a GST rate: 0% to 100%.
pub fn validate_tax_rate(rate: TaxRate) -> ValidationResult<()> {
    if rate.bps() > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "gst".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Validates a stock threshold or opening quantity.
pub fn validate_stock_level(field: &str, qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates a product before insert.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_sku(&product.sku)?;
    validate_name("name", &product.name)?;
    validate_price("purchase_price", product.purchase_price)?;
    validate_price("selling_price", product.selling_price)?;
    if let Some(mrp) = product.mrp {
        validate_price("mrp", mrp)?;
    }
    validate_tax_rate(product.gst)?;
    validate_stock_level("opening_stock", product.opening_stock)?;
    validate_stock_level("low_stock_alert", product.low_stock_alert)
}

/// Validates editable product fields.
pub fn validate_product_details(details: &ProductDetails) -> ValidationResult<()> {
    validate_name("name", &details.name)?;
    validate_price("purchase_price", details.purchase_price)?;
    validate_price("selling_price", details.selling_price)?;
    if let Some(mrp) = details.mrp {
        validate_price("mrp", mrp)?;
    }
    validate_tax_rate(details.gst)?;
    validate_stock_level("low_stock_alert", details.low_stock_alert)
}

/// Validates a category name: required, at most 100 characters.
pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name)?;

    if name.trim().len() > 100 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates customer fields.
pub fn validate_customer(details: &CustomerDetails) -> ValidationResult<()> {
    validate_name("name", &details.name)?;

    if let Some(phone) = &details.phone {
        if phone.len() > 30 {
            return Err(ValidationError::TooLong {
                field: "phone".to_string(),
                max: 30,
            });
        }
    }

    if let Some(email) = &details.email {
        if !email.contains('@') {
            return Err(ValidationError::InvalidFormat {
                field: "email".to_string(),
                reason: "must contain '@'".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("ATTA-10KG").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(Money::from_cents(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
        assert!(validate_payment_amount(Money::from_cents(-100)).is_err());
        assert!(validate_payment_amount(MAX_PAYMENT_AMOUNT).is_ok());
        assert!(validate_payment_amount(Money::from_cents(i64::MAX)).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price("price", Money::zero()).is_ok());
        assert!(validate_price("price", MAX_UNIT_PRICE).is_ok());
        assert!(validate_price("price", Money::from_cents(-1)).is_err());
        assert!(matches!(
            validate_price("price", MAX_UNIT_PRICE + Money::from_cents(1)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_tax_rate() {
        assert!(validate_tax_rate(TaxRate::zero()).is_ok());
        assert!(validate_tax_rate(TaxRate::from_percent(28)).is_ok());
        assert!(validate_tax_rate(TaxRate::from_bps(10_001)).is_err());
    }

    #[test]
    fn test_validate_new_product() {
        let ok = NewProduct::new("DAL-1KG", "Toor Dal", Money::from_major(160));
        assert!(validate_new_product(&ok).is_ok());

        let negative_stock = ok.clone().opening_stock(-1);
        assert!(validate_new_product(&negative_stock).is_err());

        let mut negative_price = ok.clone();
        negative_price.selling_price = Money::from_cents(-1);
        assert!(validate_new_product(&negative_price).is_err());

        let mut huge_price = ok.clone();
        huge_price.selling_price = Money::from_cents(i64::MAX / 2);
        assert!(validate_new_product(&huge_price).is_err());

        let huge_mrp = ProductDetails {
            category_id: None,
            name: "Toor Dal".to_string(),
            brand: None,
            unit: "kg".to_string(),
            purchase_price: Money::from_major(120),
            selling_price: Money::from_major(160),
            mrp: Some(Money::from_cents(i64::MAX)),
            gst: TaxRate::zero(),
            low_stock_alert: 0,
            status: Default::default(),
        };
        assert!(validate_product_details(&huge_mrp).is_err());
    }

    #[test]
    fn test_validate_category_name() {
        assert!(validate_category_name("Pulses").is_ok());
        assert!(validate_category_name(" ").is_err());
        assert!(validate_category_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_customer() {
        assert!(validate_customer(&CustomerDetails::new("Asha")).is_ok());
        assert!(validate_customer(&CustomerDetails::new("  ")).is_err());

        let mut bad_email = CustomerDetails::new("Asha");
        bad_email.email = Some("asha.example.com".to_string());
        assert!(validate_customer(&bad_email).is_err());
    }
}
