//! # Product Repository
//!
//! Catalog operations for products.
//!
//! ## Key Operations
//! - Insert (with an opening-stock movement)
//! - Lookup by id or SKU, LIKE search, low-stock report, both optionally
//!   narrowed to a category
//! - Catalog edits that never touch `current_stock`
//! - Delete, refused once sales or movements reference the product
//!
//! ## Who May Change Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.current_stock                                                │
//! │       ▲                ▲                   ▲                            │
//! │       │                │                   │                            │
//! │  insert (opening)   StockLedger        BillingEngine                   │
//! │  + IN movement      adjust / return    guarded decrement + SALE        │
//! │                                                                         │
//! │  update_details() has no stock column in its SET list.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use kirana_core::validation::{validate_new_product, validate_product_details};
use kirana_core::{
    CategoryId, MovementType, NewProduct, Product, ProductDetails, ProductId, TenantId,
    REFERENCE_OPENING_STOCK,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, LedgerError, LedgerResult};
use crate::repository::category::find_category;
use crate::repository::escape_like;
use crate::repository::stock::{insert_movement, NewMovement};
use crate::repository::tenant::ensure_tenant;
use crate::transaction::WriteTx;

/// Default and maximum page size of [`ProductRepository::search`].
const MAX_SEARCH_LIMIT: u32 = 100;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let atta = repo.insert(tenant_id, NewProduct::new("ATTA-10KG", "Atta 10kg", Money::from_major(420))).await?;
/// let hits = repo.search(tenant_id, "atta", None, 20).await?;
/// let low_pulses = repo.low_stock(tenant_id, Some(pulses_id)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// A positive `opening_stock` is written as the initial counter and as
    /// an `IN` movement referenced "Opening Stock", in one transaction.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(..)` with kind `Conflict` - SKU already exists in the tenant
    /// * `Err(..)` with kind `NotFound` - Unknown tenant, or a category that
    ///   is not the tenant's
    pub async fn insert(&self, tenant_id: TenantId, product: NewProduct) -> LedgerResult<Product> {
        validate_new_product(&product)?;
        debug!(tenant_id, sku = %product.sku, "Inserting product");

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = insert_in(&mut tx, tenant_id, &product).await;
        let inserted = tx.finish(result).await?;

        info!(
            tenant_id,
            product_id = inserted.id,
            sku = %inserted.sku,
            opening_stock = inserted.current_stock,
            "Product created"
        );
        Ok(inserted)
    }

    /// Gets a product of `tenant_id` by id.
    pub async fn get(&self, tenant_id: TenantId, id: ProductId) -> LedgerResult<Product> {
        find_product(&self.pool, tenant_id, id).await
    }

    /// Gets a product of `tenant_id` by SKU.
    pub async fn get_by_sku(&self, tenant_id: TenantId, sku: &str) -> LedgerResult<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE tenant_id = ?1 AND sku = ?2")
            .bind(tenant_id)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| LedgerError::not_found("Product", sku))
    }

    /// Searches name, SKU and brand with a case-insensitive substring match.
    ///
    /// An empty query lists active products by name. `category` narrows the
    /// result to one category. `limit` is clamped to 1..=100.
    pub async fn search(
        &self,
        tenant_id: TenantId,
        query: &str,
        category: Option<CategoryId>,
        limit: u32,
    ) -> LedgerResult<Vec<Product>> {
        let query = query.trim();
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);

        debug!(tenant_id, query = %query, ?category, limit, "Searching products");

        let pattern = format!("%{}%", escape_like(query));
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE tenant_id = ?1
              AND status = 'active'
              AND (?3 IS NULL OR category_id = ?3)
              AND (name LIKE ?2 ESCAPE '\' OR sku LIKE ?2 ESCAPE '\' OR brand LIKE ?2 ESCAPE '\')
            ORDER BY name, id
            LIMIT ?4
            "#,
        )
        .bind(tenant_id)
        .bind(pattern)
        .bind(category)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Active products at or below their low-stock threshold, emptiest
    /// first, optionally limited to one category.
    pub async fn low_stock(&self, tenant_id: TenantId, category: Option<CategoryId>) -> LedgerResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE tenant_id = ?1
              AND status = 'active'
              AND (?2 IS NULL OR category_id = ?2)
              AND current_stock <= low_stock_alert
            ORDER BY current_stock, id
            "#,
        )
        .bind(tenant_id)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Edits catalog fields. `current_stock` is never written here.
    ///
    /// A new category must belong to the same tenant (`NotFound` otherwise).
    pub async fn update_details(
        &self,
        tenant_id: TenantId,
        id: ProductId,
        details: ProductDetails,
    ) -> LedgerResult<Product> {
        validate_product_details(&details)?;
        debug!(tenant_id, product_id = id, "Updating product");

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = update_in(&mut tx, tenant_id, id, &details).await;
        tx.finish(result).await
    }

    /// Deletes a product.
    ///
    /// Refused with kind `Conflict` once any bill item or stock movement
    /// references it (including its opening-stock movement). Mark it
    /// inactive through [`update_details`](Self::update_details) instead.
    pub async fn delete(&self, tenant_id: TenantId, id: ProductId) -> LedgerResult<()> {
        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = match sqlx::query("DELETE FROM products WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(tenant_id)
            .execute(&mut *tx)
            .await
        {
            Ok(r) if r.rows_affected() == 1 => Ok(()),
            Ok(_) => Err(LedgerError::not_found("Product", id)),
            Err(err) => Err(err.into()),
        };
        tx.finish(result).await?;

        info!(tenant_id, product_id = id, "Product deleted");
        Ok(())
    }
}

async fn insert_in(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    product: &NewProduct,
) -> LedgerResult<Product> {
    ensure_tenant(conn, tenant_id).await?;
    if let Some(category_id) = product.category_id {
        find_category(&mut *conn, tenant_id, category_id).await?;
    }

    let sku = product.sku.trim();
    let inserted = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (
            tenant_id, sku, name, brand, unit,
            purchase_price_cents, selling_price_cents, mrp_cents, gst_bps,
            current_stock, low_stock_alert, status, created_at, category_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'active', ?12, ?13)
        RETURNING *
        "#,
    )
    .bind(tenant_id)
    .bind(sku)
    .bind(product.name.trim())
    .bind(&product.brand)
    .bind(product.unit.trim())
    .bind(product.purchase_price.cents())
    .bind(product.selling_price.cents())
    .bind(product.mrp.map(|m| m.cents()))
    .bind(product.gst.bps())
    .bind(product.opening_stock)
    .bind(product.low_stock_alert)
    .bind(Utc::now())
    .bind(product.category_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|err| match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("sku", sku),
        other => other,
    })?;

    if product.opening_stock > 0 {
        let opening = NewMovement::new(
            inserted.id,
            MovementType::In,
            product.opening_stock,
            REFERENCE_OPENING_STOCK,
        );
        insert_movement(conn, tenant_id, &opening).await?;
    }

    Ok(inserted)
}

async fn update_in(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    id: ProductId,
    details: &ProductDetails,
) -> LedgerResult<Product> {
    if let Some(category_id) = details.category_id {
        find_category(&mut *conn, tenant_id, category_id).await?;
    }

    sqlx::query_as::<_, Product>(
        r#"
        UPDATE products SET
            name = ?3,
            brand = ?4,
            unit = ?5,
            purchase_price_cents = ?6,
            selling_price_cents = ?7,
            mrp_cents = ?8,
            gst_bps = ?9,
            low_stock_alert = ?10,
            status = ?11,
            category_id = ?12
        WHERE id = ?1 AND tenant_id = ?2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(details.name.trim())
    .bind(&details.brand)
    .bind(details.unit.trim())
    .bind(details.purchase_price.cents())
    .bind(details.selling_price.cents())
    .bind(details.mrp.map(|m| m.cents()))
    .bind(details.gst.bps())
    .bind(details.low_stock_alert)
    .bind(details.status)
    .bind(details.category_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| LedgerError::not_found("Product", id))
}

/// Looks up a product inside the caller's tenant.
///
/// A product of another tenant is reported exactly like a missing one.
pub(crate) async fn find_product<'e, E>(executor: E, tenant_id: TenantId, id: ProductId) -> LedgerResult<Product>
where
    E: sqlx::SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1 AND tenant_id = ?2")
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| LedgerError::not_found("Product", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{product, with_tenant};
    use kirana_core::{Money, ProductStatus, TaxRate};

    #[tokio::test]
    async fn test_insert_records_opening_stock() {
        let (db, tenant) = with_tenant().await;

        let rice = db
            .products()
            .insert(
                tenant.id,
                NewProduct::new("RICE-5KG", "Basmati Rice 5kg", Money::from_major(450))
                    .gst(TaxRate::from_percent(5))
                    .opening_stock(20)
                    .low_stock_alert(5),
            )
            .await
            .unwrap();

        assert_eq!(rice.current_stock, 20);
        assert_eq!(rice.gst_rate(), TaxRate::from_percent(5));
        assert_eq!(rice.status, ProductStatus::Active);

        let history = db.stock().history(tenant.id, rice.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].movement_type, MovementType::In);
        assert_eq!(history[0].quantity, 20);
        assert_eq!(history[0].reference_type.as_deref(), Some(REFERENCE_OPENING_STOCK));
    }

    #[tokio::test]
    async fn test_zero_opening_stock_writes_no_movement() {
        let (db, tenant) = with_tenant().await;
        let salt = product(&db, &tenant, "SALT-1KG", 25, 0).await;

        assert!(db.stock().history(tenant.id, salt.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_conflict() {
        let (db, tenant) = with_tenant().await;
        product(&db, &tenant, "SUGAR-1KG", 45, 1).await;

        let err = db
            .products()
            .insert(tenant.id, NewProduct::new("SUGAR-1KG", "Sugar again", Money::from_major(45)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // Same SKU in another tenant is fine.
        let other = db.tenants().create("Other").await.unwrap();
        assert!(db
            .products()
            .insert(other.id, NewProduct::new("SUGAR-1KG", "Sugar", Money::from_major(45)))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_get_is_tenant_scoped() {
        let (db, tenant) = with_tenant().await;
        let other = db.tenants().create("Other").await.unwrap();
        let tea = product(&db, &tenant, "TEA-250G", 120, 3).await;

        assert_eq!(db.products().get(tenant.id, tea.id).await.unwrap(), tea);
        assert_eq!(db.products().get_by_sku(tenant.id, "TEA-250G").await.unwrap().id, tea.id);

        let err = db.products().get(other.id, tea.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = db.products().get_by_sku(other.id, "TEA-250G").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_search_and_low_stock() {
        let (db, tenant) = with_tenant().await;
        db.products()
            .insert(
                tenant.id,
                NewProduct::new("ATTA-10KG", "Whole Wheat Atta", Money::from_major(420))
                    .opening_stock(2)
                    .low_stock_alert(3),
            )
            .await
            .unwrap();
        product(&db, &tenant, "OIL-1L", 180, 10).await;

        let hits = db.products().search(tenant.id, "atta", None, 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sku, "ATTA-10KG");

        assert_eq!(db.products().search(tenant.id, "", None, 20).await.unwrap().len(), 2);
        assert!(db.products().search(tenant.id, "100%", None, 20).await.unwrap().is_empty());

        let low = db.products().low_stock(tenant.id, None).await.unwrap();
        assert_eq!(low.len(), 1);
        assert!(low[0].is_low_stock());
    }

    #[tokio::test]
    async fn test_category_filters() {
        let (db, tenant) = with_tenant().await;
        let pulses = db.categories().insert(tenant.id, "Pulses", None).await.unwrap();
        let oils = db.categories().insert(tenant.id, "Oils", None).await.unwrap();

        let insert = |sku: &'static str, name: &'static str, category: CategoryId, stock: i64| {
            let db = db.clone();
            async move {
                db.products()
                    .insert(
                        tenant.id,
                        NewProduct::new(sku, name, Money::from_major(100))
                            .in_category(category)
                            .opening_stock(stock)
                            .low_stock_alert(5),
                    )
                    .await
                    .unwrap()
            }
        };
        let toor = insert("DAL-TOOR", "Toor Dal", pulses.id, 2).await;
        insert("DAL-MOONG", "Moong Dal", pulses.id, 40).await;
        let mustard = insert("OIL-MUSTARD", "Mustard Oil", oils.id, 1).await;
        assert_eq!(toor.category_id, Some(pulses.id));

        let dal = db.products().search(tenant.id, "dal", Some(pulses.id), 20).await.unwrap();
        assert_eq!(dal.len(), 2);
        assert!(db.products().search(tenant.id, "dal", Some(oils.id), 20).await.unwrap().is_empty());
        assert_eq!(db.products().search(tenant.id, "", None, 20).await.unwrap().len(), 3);

        let low = db.products().low_stock(tenant.id, Some(pulses.id)).await.unwrap();
        assert_eq!(low.iter().map(|p| p.id).collect::<Vec<_>>(), vec![toor.id]);
        let low = db.products().low_stock(tenant.id, None).await.unwrap();
        assert_eq!(low.iter().map(|p| p.id).collect::<Vec<_>>(), vec![mustard.id, toor.id]);
    }

    #[tokio::test]
    async fn test_foreign_category_is_rejected() {
        let (db, tenant) = with_tenant().await;
        let other = db.tenants().create("Other").await.unwrap();
        let theirs = db.categories().insert(other.id, "Snacks", None).await.unwrap();
        let ours = db.categories().insert(tenant.id, "Snacks", None).await.unwrap();

        let err = db
            .products()
            .insert(tenant.id, NewProduct::new("CHIPS", "Salted Chips", Money::from_major(20)).in_category(theirs.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(db.products().get_by_sku(tenant.id, "CHIPS").await.is_err());

        let chips = product(&db, &tenant, "CHIPS", 20, 0).await;
        assert_eq!(chips.category_id, None);

        let mut details = ProductDetails::from(&chips);
        details.category_id = Some(theirs.id);
        let err = db.products().update_details(tenant.id, chips.id, details.clone()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        details.category_id = Some(ours.id);
        let moved = db.products().update_details(tenant.id, chips.id, details).await.unwrap();
        assert_eq!(moved.category_id, Some(ours.id));
    }

    #[tokio::test]
    async fn test_update_details_leaves_stock_alone() {
        let (db, tenant) = with_tenant().await;
        let ghee = product(&db, &tenant, "GHEE-500ML", 350, 6).await;

        let mut details = ProductDetails::from(&ghee);
        details.selling_price = Money::from_major(365);
        details.gst = TaxRate::from_percent(12);
        details.status = ProductStatus::Inactive;

        let updated = db.products().update_details(tenant.id, ghee.id, details.clone()).await.unwrap();
        assert_eq!(updated.selling_price(), Money::from_major(365));
        assert_eq!(updated.gst_bps, 1200);
        assert_eq!(updated.status, ProductStatus::Inactive);
        assert_eq!(updated.current_stock, 6);

        let err = db.products().update_details(tenant.id, 9_999, details).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_unreferenced_and_referenced() {
        let (db, tenant) = with_tenant().await;
        let fresh = product(&db, &tenant, "FRESH", 10, 0).await;
        let stocked = product(&db, &tenant, "STOCKED", 10, 4).await;

        db.products().delete(tenant.id, fresh.id).await.unwrap();
        assert_eq!(
            db.products().get(tenant.id, fresh.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );

        let err = db.products().delete(tenant.id, stocked.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(db.products().get(tenant.id, stocked.id).await.is_ok());
    }
}
