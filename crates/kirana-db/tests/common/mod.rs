//! Common utilities for integration tests against file-backed databases.

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use kirana_core::{Money, NewProduct, Product, TaxRate, Tenant};
use kirana_db::{Database, DbConfig};
use uuid::Uuid;

/// A WAL database in the temp dir, removed on drop.
pub struct ScratchDb {
    pub db: Database,
    path: PathBuf,
}

impl ScratchDb {
    /// Opens a fresh migrated database with `max_connections` pooled
    /// connections and the given write-lock wait.
    pub async fn new(max_connections: u32, lock_timeout: Duration) -> Self {
        let path = std::env::temp_dir().join(format!("kirana-test-{}.db", Uuid::new_v4()));
        let config = DbConfig::new(&path)
            .max_connections(max_connections)
            .lock_timeout(lock_timeout);

        let db = Database::new(config).await.expect("Failed to open scratch database");
        ScratchDb { db, path }
    }

    /// Default scratch database: 8 connections, 10 s lock wait.
    pub async fn default_pool() -> Self {
        Self::new(8, Duration::from_secs(10)).await
    }
}

impl Drop for ScratchDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

/// Provisions a tenant.
pub async fn tenant(db: &Database, name: &str) -> Tenant {
    db.tenants().create(name).await.expect("Failed to create tenant")
}

/// Inserts a product priced at `price` whole units with `stock` on hand.
pub async fn product(db: &Database, tenant: &Tenant, sku: &str, price: i64, gst_percent: u32, stock: i64) -> Product {
    db.products()
        .insert(
            tenant.id,
            NewProduct::new(sku, format!("Product {}", sku), Money::from_major(price))
                .gst(TaxRate::from_percent(gst_percent))
                .opening_stock(stock),
        )
        .await
        .expect("Failed to create product")
}

/// Current row count of `table`.
pub async fn count(db: &Database, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    sqlx::query_scalar(&sql)
        .fetch_one(db.pool())
        .await
        .expect("Failed to count rows")
}
