//! # Stock Ledger
//!
//! The append-only movement log and the counter it explains.
//!
//! ## Pairing Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  One WriteTx                                                            │
//! │  ├── UPDATE products SET current_stock = current_stock ± qty            │
//! │  └── INSERT INTO stock_movements (type, qty, reference, reason)         │
//! │                                                                         │
//! │  Never one without the other, so at every commit:                      │
//! │      current_stock == Σ IN + Σ RETURN - Σ OUT - Σ SALE                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Movements are never updated or deleted. Decrements always use the guarded
//! form `... WHERE current_stock >= ?`; a zero row count means the stock was
//! not there.

use chrono::Utc;
use kirana_core::ledger::{ledger_balance, plan_adjustment};
use kirana_core::{
    CoreError, MovementType, Product, ProductId, StockMovement, StockReconciliation, TenantId,
    ValidationError, REFERENCE_MANUAL_ADD, REFERENCE_MANUAL_DEDUCTION, REFERENCE_RETURN,
};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbResult, LedgerResult};
use crate::repository::product::find_product;
use crate::transaction::WriteTx;

// =============================================================================
// Inputs
// =============================================================================

/// A movement about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub product_id: ProductId,
    pub movement_type: MovementType,
    /// Positive; direction comes from `movement_type`.
    pub quantity: i64,
    pub reference_type: String,
    pub reason: Option<String>,
}

impl NewMovement {
    pub fn new(
        product_id: ProductId,
        movement_type: MovementType,
        quantity: i64,
        reference_type: impl Into<String>,
    ) -> Self {
        NewMovement {
            product_id,
            movement_type,
            quantity,
            reference_type: reference_type.into(),
            reason: None,
        }
    }

    /// Attaches a free-text reason (bill id, supplier note, ...).
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Filter for tenant-wide movement listings. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<ProductId>,
    pub movement_type: Option<MovementType>,
    /// Maximum rows; unbounded when `None`.
    pub limit: Option<u32>,
}

// =============================================================================
// StockLedger
// =============================================================================

/// Stock adjustments, returns and movement history.
///
/// ## Usage
/// ```rust,ignore
/// let ledger = db.stock();
///
/// let stock = ledger.adjust_stock(tenant_id, rice_id, 24, "Supplier delivery").await?;
/// let history = ledger.history(tenant_id, rice_id).await?;   // newest first
/// assert!(ledger.reconcile(tenant_id, rice_id).await?.is_consistent());
/// ```
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    /// Creates a new StockLedger.
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Appends a movement and applies it to the product's counter.
    ///
    /// `IN`/`RETURN` increment, `OUT` decrements. A decrement larger than
    /// the stock on hand fails with `InsufficientStock` and changes nothing.
    ///
    /// `SALE` movements are written only by the billing engine together
    /// with their bill; passing one here fails with `InvalidRequest`.
    pub async fn record_movement(
        &self,
        tenant_id: TenantId,
        movement: NewMovement,
    ) -> LedgerResult<StockMovement> {
        if movement.movement_type == MovementType::Sale {
            return Err(CoreError::invalid("SALE movements are recorded by creating a sale").into());
        }

        if movement.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = apply_movement(&mut tx, tenant_id, &movement).await;
        let recorded = tx.finish(result).await?;

        info!(
            tenant_id,
            product_id = recorded.product_id,
            movement_type = %recorded.movement_type,
            quantity = recorded.quantity,
            "Stock movement recorded"
        );
        Ok(recorded)
    }

    /// Manual stock correction outside a sale.
    ///
    /// Positive `delta` records an `IN`, negative an `OUT`. Returns the new
    /// stock level.
    pub async fn adjust_stock(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        delta: i64,
        reason: &str,
    ) -> LedgerResult<i64> {
        debug!(tenant_id, product_id, delta, "Adjusting stock");

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = adjust_in(&mut tx, tenant_id, product_id, delta, reason).await;
        let new_stock = tx.finish(result).await?;

        info!(tenant_id, product_id, delta, new_stock, "Stock adjusted");
        Ok(new_stock)
    }

    /// Puts returned units back on the shelf.
    pub async fn record_return(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: i64,
        reason: &str,
    ) -> LedgerResult<StockMovement> {
        let movement =
            NewMovement::new(product_id, MovementType::Return, quantity, REFERENCE_RETURN).reason(reason);
        self.record_movement(tenant_id, movement).await
    }

    /// Movements of one product, newest first.
    pub async fn history(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> LedgerResult<Vec<StockMovement>> {
        find_product(&self.pool, tenant_id, product_id).await?;

        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE tenant_id = ?1 AND product_id = ?2
            ORDER BY id DESC
            "#,
        )
        .bind(tenant_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(product_id, count = movements.len(), "Loaded stock history");
        Ok(movements)
    }

    /// Tenant-wide movement listing, newest first.
    pub async fn movements(
        &self,
        tenant_id: TenantId,
        filter: &MovementFilter,
    ) -> LedgerResult<Vec<StockMovement>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM stock_movements WHERE tenant_id = ");
        query.push_bind(tenant_id);

        if let Some(product_id) = filter.product_id {
            query.push(" AND product_id = ").push_bind(product_id);
        }
        if let Some(movement_type) = filter.movement_type {
            query.push(" AND movement_type = ").push_bind(movement_type);
        }

        query.push(" ORDER BY id DESC");

        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let movements = query
            .build_query_as::<StockMovement>()
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Compares a product's counter to the sum of its movements.
    ///
    /// Both are read inside one transaction, so a concurrent sale cannot
    /// fall between the two reads.
    pub async fn reconcile(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> LedgerResult<StockReconciliation> {
        let mut tx = self.pool.begin().await?;

        let product = find_product(&mut *tx, tenant_id, product_id).await?;
        let movements = sqlx::query_as::<_, StockMovement>(
            "SELECT * FROM stock_movements WHERE tenant_id = ?1 AND product_id = ?2",
        )
        .bind(tenant_id)
        .bind(product_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(StockReconciliation {
            product_id,
            current_stock: product.current_stock,
            ledger_balance: ledger_balance(&movements),
        })
    }
}

// =============================================================================
// Transaction-scoped helpers
// =============================================================================

async fn adjust_in(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    product_id: ProductId,
    delta: i64,
    reason: &str,
) -> LedgerResult<i64> {
    let product = find_product(&mut *conn, tenant_id, product_id).await?;
    let plan = plan_adjustment(&product, delta)?;

    let reference = match plan.movement_type {
        MovementType::In => REFERENCE_MANUAL_ADD,
        _ => REFERENCE_MANUAL_DEDUCTION,
    };
    let movement =
        NewMovement::new(product_id, plan.movement_type, plan.quantity, reference).reason(reason);

    apply_to_counter(conn, tenant_id, &product, &movement).await?;
    insert_movement(conn, tenant_id, &movement).await?;

    Ok(plan.new_stock)
}

/// Loads the product, moves its counter, appends the movement.
async fn apply_movement(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    movement: &NewMovement,
) -> LedgerResult<StockMovement> {
    let product = find_product(&mut *conn, tenant_id, movement.product_id).await?;
    apply_to_counter(conn, tenant_id, &product, movement).await?;
    Ok(insert_movement(conn, tenant_id, movement).await?)
}

async fn apply_to_counter(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    product: &Product,
    movement: &NewMovement,
) -> LedgerResult<()> {
    if movement.movement_type.sign() > 0 {
        increase_stock(conn, tenant_id, product.id, movement.quantity).await?;
        return Ok(());
    }

    if !decrease_stock(conn, tenant_id, product.id, movement.quantity).await? {
        return Err(CoreError::InsufficientStock {
            line: 0,
            product_id: product.id,
            sku: product.sku.clone(),
            available: product.current_stock,
            requested: movement.quantity,
        }
        .into());
    }

    Ok(())
}

/// Appends one movement row.
pub(crate) async fn insert_movement(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    movement: &NewMovement,
) -> DbResult<StockMovement> {
    let recorded = sqlx::query_as::<_, StockMovement>(
        r#"
        INSERT INTO stock_movements (
            tenant_id, product_id, movement_type, quantity,
            reference_type, reason, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING *
        "#,
    )
    .bind(tenant_id)
    .bind(movement.product_id)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(&movement.reference_type)
    .bind(&movement.reason)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;

    Ok(recorded)
}

/// `current_stock += quantity`.
pub(crate) async fn increase_stock(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    product_id: ProductId,
    quantity: i64,
) -> DbResult<()> {
    sqlx::query(
        "UPDATE products SET current_stock = current_stock + ?1 WHERE id = ?2 AND tenant_id = ?3",
    )
    .bind(quantity)
    .bind(product_id)
    .bind(tenant_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Guarded `current_stock -= quantity`. Returns false, changing nothing,
/// when fewer than `quantity` units are on hand.
pub(crate) async fn decrease_stock(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    product_id: ProductId,
    quantity: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET current_stock = current_stock - ?1
        WHERE id = ?2 AND tenant_id = ?3 AND current_stock >= ?1
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .bind(tenant_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{product, with_tenant};
    use kirana_core::{REFERENCE_BILL, REFERENCE_OPENING_STOCK};

    #[tokio::test]
    async fn test_adjust_stock_in_and_out() {
        let (db, tenant) = with_tenant().await;
        let rice = product(&db, &tenant, "RICE-5KG", 450, 10).await;

        let stock = db.stock().adjust_stock(tenant.id, rice.id, 5, "Delivery").await.unwrap();
        assert_eq!(stock, 15);

        let stock = db.stock().adjust_stock(tenant.id, rice.id, -3, "Damaged").await.unwrap();
        assert_eq!(stock, 12);

        let history = db.stock().history(tenant.id, rice.id).await.unwrap();
        let kinds: Vec<_> = history.iter().map(|m| m.movement_type).collect();
        assert_eq!(
            kinds,
            vec![MovementType::Out, MovementType::In, MovementType::In]
        );
        assert_eq!(history[0].reference_type.as_deref(), Some(REFERENCE_MANUAL_DEDUCTION));
        assert_eq!(history[0].reason.as_deref(), Some("Damaged"));
        assert_eq!(history[2].reference_type.as_deref(), Some(REFERENCE_OPENING_STOCK));
    }

    #[tokio::test]
    async fn test_adjust_below_zero_is_rejected() {
        let (db, tenant) = with_tenant().await;
        let oil = product(&db, &tenant, "OIL-1L", 180, 2).await;

        let err = db.stock().adjust_stock(tenant.id, oil.id, -3, "Audit").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let reloaded = db.products().get(tenant.id, oil.id).await.unwrap();
        assert_eq!(reloaded.current_stock, 2);
        assert_eq!(db.stock().history(tenant.id, oil.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_adjustment_is_invalid() {
        let (db, tenant) = with_tenant().await;
        let salt = product(&db, &tenant, "SALT-1KG", 25, 0).await;

        let err = db.stock().adjust_stock(tenant.id, salt.id, 0, "noop").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_record_return() {
        let (db, tenant) = with_tenant().await;
        let soap = product(&db, &tenant, "SOAP-100G", 40, 0).await;

        let movement = db.stock().record_return(tenant.id, soap.id, 2, "Unopened").await.unwrap();
        assert_eq!(movement.movement_type, MovementType::Return);
        assert_eq!(movement.signed_quantity(), 2);

        assert_eq!(db.products().get(tenant.id, soap.id).await.unwrap().current_stock, 2);
    }

    #[tokio::test]
    async fn test_record_movement_guards_decrement() {
        let (db, tenant) = with_tenant().await;
        let tea = product(&db, &tenant, "TEA-250G", 120, 1).await;

        let out = NewMovement::new(tea.id, MovementType::Out, 2, REFERENCE_MANUAL_DEDUCTION);
        let err = db.stock().record_movement(tenant.id, out).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let zero = NewMovement::new(tea.id, MovementType::In, 0, REFERENCE_MANUAL_ADD);
        let err = db.stock().record_movement(tenant.id, zero).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_sale_movement_needs_a_bill() {
        let (db, tenant) = with_tenant().await;
        let tea = product(&db, &tenant, "TEA-250G", 120, 5).await;

        let sale = NewMovement::new(tea.id, MovementType::Sale, 2, REFERENCE_BILL).reason("42");
        let err = db.stock().record_movement(tenant.id, sale).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        assert_eq!(db.products().get(tenant.id, tea.id).await.unwrap().current_stock, 5);
        assert_eq!(db.stock().history(tenant.id, tea.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_tenant_scoped() {
        let (db, tenant) = with_tenant().await;
        let other = db.tenants().create("Other").await.unwrap();
        let milk = product(&db, &tenant, "MILK-1L", 60, 4).await;

        let err = db.stock().history(other.id, milk.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = db.stock().adjust_stock(other.id, milk.id, 1, "x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_movements_filter() {
        let (db, tenant) = with_tenant().await;
        let a = product(&db, &tenant, "A", 10, 5).await;
        let b = product(&db, &tenant, "B", 10, 5).await;
        db.stock().adjust_stock(tenant.id, a.id, -1, "x").await.unwrap();

        let all = db.stock().movements(tenant.id, &MovementFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let only_b = MovementFilter {
            product_id: Some(b.id),
            ..Default::default()
        };
        assert_eq!(db.stock().movements(tenant.id, &only_b).await.unwrap().len(), 1);

        let outs = MovementFilter {
            movement_type: Some(MovementType::Out),
            limit: Some(10),
            ..Default::default()
        };
        let outs = db.stock().movements(tenant.id, &outs).await.unwrap();
        assert_eq!(outs.len(), 1);
        assert_eq!(outs[0].product_id, a.id);
    }

    #[tokio::test]
    async fn test_reconcile() {
        let (db, tenant) = with_tenant().await;
        let dal = product(&db, &tenant, "DAL-1KG", 160, 7).await;
        db.stock().adjust_stock(tenant.id, dal.id, -2, "Spill").await.unwrap();
        db.stock().record_return(tenant.id, dal.id, 1, "Return").await.unwrap();

        let rec = db.stock().reconcile(tenant.id, dal.id).await.unwrap();
        assert_eq!(rec.current_stock, 6);
        assert!(rec.is_consistent());

        // A counter edited behind the ledger's back shows up as drift.
        sqlx::query("UPDATE products SET current_stock = 9 WHERE id = ?1")
            .bind(dal.id)
            .execute(db.pool())
            .await
            .unwrap();
        let rec = db.stock().reconcile(tenant.id, dal.id).await.unwrap();
        assert_eq!(rec.drift(), 3);
    }
}
