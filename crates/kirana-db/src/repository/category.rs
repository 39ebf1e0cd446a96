//! # Category Repository
//!
//! Tenant-scoped product categories. A product may be filed under one
//! category of its own tenant; search and the low-stock report can be
//! narrowed to a category.

use chrono::Utc;
use kirana_core::validation::validate_category_name;
use kirana_core::{Category, CategoryId, TenantId};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, LedgerError, LedgerResult};
use crate::repository::tenant::ensure_tenant;
use crate::transaction::WriteTx;

/// Repository for product categories.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Adds an active category.
    ///
    /// ## Returns
    /// * `Err(..)` with kind `Conflict` - The tenant already has a category of that name
    /// * `Err(..)` with kind `NotFound` - Unknown tenant
    pub async fn insert(
        &self,
        tenant_id: TenantId,
        name: &str,
        description: Option<&str>,
    ) -> LedgerResult<Category> {
        validate_category_name(name)?;
        debug!(tenant_id, name, "Inserting category");

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = insert_in(&mut tx, tenant_id, name.trim(), description).await;
        let category = tx.finish(result).await?;

        info!(tenant_id, category_id = category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Gets a category of `tenant_id`.
    pub async fn get(&self, tenant_id: TenantId, id: CategoryId) -> LedgerResult<Category> {
        find_category(&self.pool, tenant_id, id).await
    }

    /// All categories of the tenant by name.
    pub async fn list(&self, tenant_id: TenantId) -> LedgerResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE tenant_id = ?1 ORDER BY name, id",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}

async fn insert_in(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    name: &str,
    description: Option<&str>,
) -> LedgerResult<Category> {
    ensure_tenant(conn, tenant_id).await?;

    let category = sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (tenant_id, name, description, status, created_at)
        VALUES (?1, ?2, ?3, 'active', ?4)
        RETURNING *
        "#,
    )
    .bind(tenant_id)
    .bind(name)
    .bind(description.map(str::trim).filter(|d| !d.is_empty()))
    .bind(Utc::now())
    .fetch_one(conn)
    .await
    .map_err(|err| match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("category", name),
        other => other,
    })?;

    Ok(category)
}

/// Looks up a category inside the caller's tenant.
///
/// A category of another tenant is reported exactly like a missing one.
pub(crate) async fn find_category<'e, E>(executor: E, tenant_id: TenantId, id: CategoryId) -> LedgerResult<Category>
where
    E: sqlx::SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?1 AND tenant_id = ?2")
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| LedgerError::not_found("Category", id))
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::test_support::with_tenant;
    use kirana_core::ProductStatus;

    #[tokio::test]
    async fn test_insert_get_and_list() {
        let (db, tenant) = with_tenant().await;

        let pulses = db.categories().insert(tenant.id, " Pulses ", Some("Dal and beans")).await.unwrap();
        let grains = db.categories().insert(tenant.id, "Grains", Some("  ")).await.unwrap();

        assert_eq!(pulses.name, "Pulses");
        assert_eq!(pulses.description.as_deref(), Some("Dal and beans"));
        assert_eq!(pulses.status, ProductStatus::Active);
        assert_eq!(grains.description, None);

        assert_eq!(db.categories().get(tenant.id, pulses.id).await.unwrap(), pulses);

        let names: Vec<_> = db
            .categories()
            .list(tenant.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Grains", "Pulses"]);
    }

    #[tokio::test]
    async fn test_names_are_unique_per_tenant() {
        let (db, tenant) = with_tenant().await;
        db.categories().insert(tenant.id, "Oils", None).await.unwrap();

        let err = db.categories().insert(tenant.id, "Oils", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let other = db.tenants().create("Other").await.unwrap();
        assert!(db.categories().insert(other.id, "Oils", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_categories_are_tenant_scoped() {
        let (db, tenant) = with_tenant().await;
        let other = db.tenants().create("Other").await.unwrap();
        let spices = db.categories().insert(tenant.id, "Spices", None).await.unwrap();

        let err = db.categories().get(other.id, spices.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(db.categories().list(other.id).await.unwrap().is_empty());

        let err = db.categories().insert(9_999, "Spices", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = db.categories().insert(tenant.id, "  ", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
