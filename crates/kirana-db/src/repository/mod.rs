//! # Repository Module
//!
//! Tenant-scoped database access for Kirana.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  API handler (tenant resolved upstream)                                │
//! │       │                                                                 │
//! │       │  db.products().search(tenant_id, "atta", None, 20)             │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── insert(&self, tenant_id, new_product)                             │
//! │  ├── get(&self, tenant_id, id)                                         │
//! │  └── update_details(&self, tenant_id, id, details)                     │
//! │       │                                                                 │
//! │       │  SQL with `tenant_id = ?` on every statement                   │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations run inside a [`WriteTx`](crate::transaction::WriteTx). The
//! `pub(crate)` helpers that take a `&mut SqliteConnection` are the pieces
//! the billing engine composes into its own transaction.
//!
//! ## Available Repositories
//!
//! - [`tenant::TenantRepository`], [`tenant::StaffRepository`] - Provisioning
//! - [`category::CategoryRepository`] - Product categories
//! - [`product::ProductRepository`] - Catalog CRUD and search
//! - [`stock::StockLedger`] - Movements, adjustments, reconciliation
//! - [`customer::CustomerRepository`] - Customers and payments
//! - [`bill::BillRepository`] - Bill read side

pub mod bill;
pub mod category;
pub mod customer;
pub mod product;
pub mod stock;
pub mod tenant;

/// Escapes LIKE wildcards so user input matches literally.
///
/// Pair with `ESCAPE '\'` in the statement.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("atta"), "atta");
    }
}
