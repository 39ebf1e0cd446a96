//! Fixtures shared by the unit tests of this crate.

use kirana_core::{Money, NewProduct, Product, TaxRate, Tenant};

use crate::pool::{Database, DbConfig};

/// Fresh migrated in-memory database.
pub(crate) async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// Database with one tenant.
pub(crate) async fn with_tenant() -> (Database, Tenant) {
    let db = memory_db().await;
    let tenant = db.tenants().create("Test Kirana").await.expect("tenant");
    (db, tenant)
}

/// Inserts a product priced at `price` whole units with `stock` on hand.
pub(crate) async fn product(db: &Database, tenant: &Tenant, sku: &str, price: i64, stock: i64) -> Product {
    db.products()
        .insert(
            tenant.id,
            NewProduct::new(sku, format!("Product {}", sku), Money::from_major(price))
                .gst(TaxRate::zero())
                .opening_stock(stock),
        )
        .await
        .expect("product")
}
