//! # Seed Data Generator
//!
//! Populates a database with a demo store for development.
//!
//! ## Usage
//! ```bash
//! # Uses kirana.toml / KIRANA_* settings
//! cargo run -p kirana-db --bin seed
//!
//! # Explicit config file and product count
//! cargo run -p kirana-db --bin seed -- --config ./dev.toml --count 200
//! ```
//!
//! ## What Gets Created
//! - One tenant ("Demo Kirana Store") with two staff members
//! - Customers with phone numbers
//! - Five staple categories with products in each, every product with
//!   opening stock and a GST rate of 0%, 5%, 12% or 18%
//! - One cash sale and one credit sale, so bills, movements and a customer
//!   balance exist from the start

use kirana_core::{
    CustomerDetails, Money, NewProduct, PaymentType, ProductId, SaleLine, SaleRequest, TaxRate,
};
use kirana_db::{Database, KiranaConfig};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Product categories for realistic demo data.
const CATEGORIES: &[(&str, &str, &[&str])] = &[
    (
        "GRN",
        "Grains and Flours",
        &[
            "Basmati Rice",
            "Sona Masoori Rice",
            "Whole Wheat Atta",
            "Maida",
            "Besan",
            "Poha",
            "Rava",
        ],
    ),
    (
        "PLS",
        "Pulses",
        &["Toor Dal", "Moong Dal", "Chana Dal", "Masoor Dal", "Urad Dal", "Rajma", "Kabuli Chana"],
    ),
    (
        "OIL",
        "Oils and Ghee",
        &["Sunflower Oil", "Mustard Oil", "Groundnut Oil", "Coconut Oil", "Desi Ghee"],
    ),
    (
        "SPC",
        "Spices",
        &["Turmeric Powder", "Red Chilli Powder", "Coriander Powder", "Garam Masala", "Jeera", "Hing"],
    ),
    (
        "PKG",
        "Packaged Foods",
        &["Glucose Biscuits", "Salted Chips", "Instant Noodles", "Tea Leaves", "Instant Coffee", "Sugar"],
    ),
];

/// Pack sizes with a price multiplier in percent.
const SIZES: &[(&str, i64)] = &[("500g", 100), ("1kg", 190), ("5kg", 900)];

const GST_RATES: &[u32] = &[0, 5, 12, 18];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Meena Sharma", "9876500001"),
    ("Arjun Patel", "9876500002"),
    ("Lakshmi Iyer", "9876500003"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 60;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kirana Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of products to generate (default: 60)");
                println!("      --config <PATH>  Config file (default: ./kirana.toml if present)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = KiranaConfig::load(config_path.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    info!(path = %config.database.path.display(), count, "Seeding database");

    let db = Database::new(config.db_config()).await?;

    let tenant = db.tenants().create("Demo Kirana Store").await?;
    let owner = db.staff().insert(tenant.id, "Suresh", "Owner").await?;
    db.staff().insert(tenant.id, "Ravi", "Cashier").await?;

    let mut customer_ids = Vec::with_capacity(CUSTOMERS.len());
    for (name, phone) in CUSTOMERS {
        let customer = db.customers().insert(tenant.id, CustomerDetails::new(*name).phone(*phone)).await?;
        customer_ids.push(customer.id);
    }

    let start = std::time::Instant::now();
    let mut product_ids: Vec<ProductId> = Vec::with_capacity(count);

    'outer: for (category_idx, (code, label, names)) in CATEGORIES.iter().enumerate() {
        let category = db.categories().insert(tenant.id, label, None).await?;

        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, multiplier)) in SIZES.iter().enumerate() {
                if product_ids.len() >= count {
                    break 'outer;
                }

                let seed = category_idx * 100 + name_idx * 10 + size_idx;
                let product = generate_product(code, name, size, *multiplier, seed).in_category(category.id);

                match db.products().insert(tenant.id, product).await {
                    Ok(p) => product_ids.push(p.id),
                    Err(e) => warn!(error = %e, "Failed to insert product"),
                }
            }
        }
    }

    info!(
        generated = product_ids.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Products generated"
    );

    if let [first, second, ..] = product_ids.as_slice() {
        let cash = SaleRequest::new(PaymentType::Cash, vec![SaleLine::new(*first, 2), SaleLine::new(*second, 1)]);
        let sale = db.billing().create_sale(tenant.id, Some(owner.id), cash).await?;
        info!(bill_id = sale.bill.id, total = %sale.bill.grand_total(), "Sample cash sale");

        if let Some(customer_id) = customer_ids.first() {
            let credit = SaleRequest::new(PaymentType::Credit, vec![SaleLine::new(*second, 3)])
                .for_customer(*customer_id)
                .with_bill_discount(Money::from_major(5));
            let sale = db.billing().create_sale(tenant.id, Some(owner.id), credit).await?;
            info!(bill_id = sale.bill.id, total = %sale.bill.grand_total(), "Sample credit sale");
        }
    }

    let low = db.products().low_stock(tenant.id, None).await?;
    println!("{}", serde_json::to_string_pretty(&tenant)?);
    println!("Products: {}, low stock: {}", product_ids.len(), low.len());

    db.close().await;
    Ok(())
}

/// Builds one product with deterministic pseudo-random data.
fn generate_product(category: &str, name: &str, size: &str, multiplier: i64, seed: usize) -> NewProduct {
    let initials: String = name
        .split_whitespace()
        .filter_map(|w| w.chars().next())
        .collect::<String>()
        .to_uppercase();
    let sku = format!("{}-{}-{:03}", category, initials, seed);

    // Base price 20.00 - 99.99 for the smallest pack
    let base_cents = 2_000 + ((seed * 37) % 8_000) as i64;
    let price = Money::from_cents(base_cents * multiplier / 100);

    // Cost 70-85% of price
    let cost = Money::from_cents(price.cents() * (70 + (seed % 16) as i64) / 100);

    let gst = TaxRate::from_percent(GST_RATES[seed % GST_RATES.len()]);
    let stock = (seed % 41) as i64 + 5;

    NewProduct::new(sku, format!("{} {}", name, size), price)
        .purchase_price(cost)
        .gst(gst)
        .opening_stock(stock)
        .low_stock_alert(10)
}
