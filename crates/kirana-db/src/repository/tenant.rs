//! # Tenant & Staff Repositories
//!
//! Provisioning of the partitioning unit and of the staff who appear as the
//! creator of a bill. Authentication lives outside this crate; here a tenant
//! is just an id that every other table hangs off.

use chrono::Utc;
use kirana_core::validation::validate_name;
use kirana_core::{Staff, StaffId, Tenant, TenantId};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use crate::transaction::WriteTx;

/// Repository for tenants.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    pool: SqlitePool,
}

impl TenantRepository {
    /// Creates a new TenantRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TenantRepository { pool }
    }

    /// Provisions a tenant in the `active` state.
    pub async fn create(&self, business_name: &str) -> LedgerResult<Tenant> {
        validate_name("business_name", business_name)?;

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (business_name, status, created_at)
            VALUES (?1, 'active', ?2)
            RETURNING *
            "#,
        )
        .bind(business_name.trim())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(LedgerError::from);
        let tenant = tx.finish(result).await?;

        info!(tenant_id = tenant.id, name = %tenant.business_name, "Tenant created");
        Ok(tenant)
    }

    /// Gets a tenant by id.
    pub async fn get(&self, id: TenantId) -> LedgerResult<Tenant> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| LedgerError::not_found("Tenant", id))
    }

    /// Deletes a tenant and, by cascade, everything it owns.
    pub async fn delete(&self, id: TenantId) -> LedgerResult<()> {
        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = match sqlx::query("DELETE FROM tenants WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
        {
            Ok(r) if r.rows_affected() == 1 => Ok(()),
            Ok(_) => Err(LedgerError::not_found("Tenant", id)),
            Err(err) => Err(err.into()),
        };
        tx.finish(result).await?;

        info!(tenant_id = id, "Tenant deleted");
        Ok(())
    }
}

/// Fails with NotFound unless the tenant exists.
pub(crate) async fn ensure_tenant(conn: &mut SqliteConnection, id: TenantId) -> LedgerResult<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM tenants WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    found
        .map(|_| ())
        .ok_or_else(|| LedgerError::not_found("Tenant", id))
}

// =============================================================================
// Staff
// =============================================================================

/// Repository for staff members.
#[derive(Debug, Clone)]
pub struct StaffRepository {
    pool: SqlitePool,
}

impl StaffRepository {
    /// Creates a new StaffRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StaffRepository { pool }
    }

    /// Adds an active staff member to a tenant.
    pub async fn insert(&self, tenant_id: TenantId, name: &str, position: &str) -> LedgerResult<Staff> {
        validate_name("name", name)?;
        debug!(tenant_id, name, "Inserting staff");

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = insert_staff(&mut tx, tenant_id, name.trim(), position.trim()).await;
        tx.finish(result).await
    }

    /// Gets a staff member of `tenant_id`.
    pub async fn get(&self, tenant_id: TenantId, id: StaffId) -> LedgerResult<Staff> {
        find_staff(&self.pool, tenant_id, id).await
    }
}

async fn insert_staff(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    name: &str,
    position: &str,
) -> LedgerResult<Staff> {
    ensure_tenant(conn, tenant_id).await?;

    let staff = sqlx::query_as::<_, Staff>(
        r#"
        INSERT INTO staff (tenant_id, name, position, is_active, created_at)
        VALUES (?1, ?2, ?3, 1, ?4)
        RETURNING *
        "#,
    )
    .bind(tenant_id)
    .bind(name)
    .bind(position)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;

    Ok(staff)
}

/// Looks up a staff member inside the caller's tenant.
pub(crate) async fn find_staff<'e, E>(executor: E, tenant_id: TenantId, id: StaffId) -> LedgerResult<Staff>
where
    E: sqlx::SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE id = ?1 AND tenant_id = ?2")
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| LedgerError::not_found("Staff", id))
}
