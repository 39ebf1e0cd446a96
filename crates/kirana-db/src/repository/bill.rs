//! # Bill Repository
//!
//! Read side of bills. Bills are written only by
//! [`BillingEngine`](crate::billing::BillingEngine) and never edited.

use chrono::{DateTime, Utc};
use kirana_core::{Bill, BillId, BillItem, BillWithItems, TenantId};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};

/// Date window for [`BillRepository::list`]. Both bounds are inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl BillFilter {
    /// Bills created within `[from, to]`.
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        BillFilter {
            from: Some(from),
            to: Some(to),
        }
    }
}

/// Repository for reading bills.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Gets a bill and its lines in insertion order.
    pub async fn get_with_items(&self, tenant_id: TenantId, bill_id: BillId) -> LedgerResult<BillWithItems> {
        let mut conn = self.pool.acquire().await?;

        let bill = sqlx::query_as::<_, Bill>("SELECT * FROM bills WHERE id = ?1 AND tenant_id = ?2")
            .bind(bill_id)
            .bind(tenant_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| LedgerError::not_found("Bill", bill_id))?;

        let items = sqlx::query_as::<_, BillItem>("SELECT * FROM bill_items WHERE bill_id = ?1 ORDER BY id")
            .bind(bill.id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(BillWithItems { bill, items })
    }

    /// Bills of a tenant, newest first.
    pub async fn list(&self, tenant_id: TenantId, filter: &BillFilter) -> LedgerResult<Vec<Bill>> {
        debug!(tenant_id, ?filter, "Listing bills");

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM bills WHERE tenant_id = ");
        qb.push_bind(tenant_id);

        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at <= ").push_bind(to);
        }

        qb.push(" ORDER BY created_at DESC, id DESC");

        let bills = qb.build_query_as::<Bill>().fetch_all(&self.pool).await?;
        Ok(bills)
    }
}
