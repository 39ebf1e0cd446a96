//! # Billing Engine
//!
//! Turns a [`SaleRequest`] into a persisted bill, its lines, the matching
//! stock decrements and `SALE` movements, and (for credit sales) the
//! customer balance update. All of it commits together or not at all.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_sale(tenant, actor, request)                                   │
//! │                                                                         │
//! │  request.validate()                  ── InvalidRequest / InvalidLine    │
//! │       │                                                                 │
//! │  BEGIN IMMEDIATE  (write lock, bounded by busy_timeout ── Busy)        │
//! │       │                                                                 │
//! │  resolve tenant, staff, customer     ── NotFound                        │
//! │  load products  ORDER BY id          ── NotFound                        │
//! │  per line, in request order:                                           │
//! │      remaining[product] >= quantity  ── InsufficientStock { line }      │
//! │      price / discount resolved       ── InvalidLine                     │
//! │       │                                                                 │
//! │  ─ ─ ─ ─ ─ ─ ─ ─ nothing written above this line ─ ─ ─ ─ ─ ─ ─ ─ ─ ─   │
//! │       │                                                                 │
//! │  INSERT bill skeleton                                                  │
//! │  INSERT bill_items                                                     │
//! │  guarded UPDATE products ... current_stock >= qty   + SALE movement    │
//! │  UPDATE bill totals from persisted items                               │
//! │  credit sale: customer.balance += grand_total                          │
//! │       │                                                                 │
//! │  COMMIT  (any error before this point: ROLLBACK)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use kirana_core::{
    Bill, BillId, BillItem, BillTotals, BillWithItems, CoreError, CustomerId, MovementType, PricedLine,
    Product, ProductId, ProductStatus, SaleRequest, StaffId, TenantId, REFERENCE_BILL,
};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, instrument, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::pool::Database;
use crate::repository::customer::{change_balance, find_customer};
use crate::repository::stock::{decrease_stock, insert_movement, NewMovement};
use crate::repository::tenant::{ensure_tenant, find_staff};
use crate::transaction::WriteTx;

/// Creates sales.
///
/// Holds a handle to the shared pool; construct one per request or keep one
/// around, both are cheap.
///
/// ## Usage
/// ```rust,ignore
/// let request = SaleRequest::new(PaymentType::Cash, vec![SaleLine::new(rice_id, 2)])
///     .with_bill_discount(Money::from_major(10));
///
/// let sale = db.billing().create_sale(tenant_id, Some(cashier_id), request).await?;
/// println!("bill #{} total {}", sale.bill.id, sale.bill.grand_total());
/// ```
#[derive(Debug, Clone)]
pub struct BillingEngine {
    pool: SqlitePool,
}

impl BillingEngine {
    /// Creates an engine backed by `db`'s pool.
    pub fn new(db: &Database) -> Self {
        BillingEngine { pool: db.pool().clone() }
    }

    /// Records one sale.
    ///
    /// ## Returns
    /// * `Ok(BillWithItems)` - The committed bill with totals recomputed from its items
    /// * `Err(..)` with kind:
    ///   - `InvalidRequest` - empty request, bad quantity, price or discount
    ///     out of range, discount above price, credit sale without customer,
    ///     inactive product
    ///   - `NotFound` - product, customer or staff unknown in this tenant
    ///   - `InsufficientStock` - first line that cannot be fulfilled
    ///   - `Busy` - write lock not granted in time; rerun the whole sale
    ///
    /// On any error nothing is persisted.
    #[instrument(
        skip(self, request),
        fields(lines = request.items.len(), payment_type = ?request.payment_type)
    )]
    pub async fn create_sale(
        &self,
        tenant_id: TenantId,
        actor: Option<StaffId>,
        request: SaleRequest,
    ) -> LedgerResult<BillWithItems> {
        if let Err(err) = request.validate() {
            warn!(error = %err, "Sale request rejected");
            return Err(err.into());
        }

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = create_sale_in(&mut tx, tenant_id, actor, &request).await;

        match tx.finish(result).await {
            Ok(sale) => {
                info!(
                    bill_id = sale.bill.id,
                    customer_id = ?sale.bill.customer_id,
                    grand_total = %sale.bill.grand_total(),
                    "Sale committed"
                );
                Ok(sale)
            }
            Err(err) => {
                warn!(error = %err, kind = ?err.kind(), "Sale rejected");
                Err(err)
            }
        }
    }
}

// =============================================================================
// Transaction body
// =============================================================================

/// A request line resolved against its locked product.
struct CheckedLine<'a> {
    product: &'a Product,
    priced: PricedLine,
}

async fn create_sale_in(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    actor: Option<StaffId>,
    request: &SaleRequest,
) -> LedgerResult<BillWithItems> {
    ensure_tenant(conn, tenant_id).await?;

    if let Some(staff_id) = actor {
        find_staff(&mut *conn, tenant_id, staff_id).await?;
    }
    if let Some(customer_id) = request.customer_id {
        find_customer(&mut *conn, tenant_id, customer_id).await?;
    }

    let products = load_products(conn, tenant_id, request).await?;
    let lines = check_lines(&products, request)?;

    let expected = BillTotals::compute(
        &lines.iter().map(|l| l.priced).collect::<Vec<_>>(),
        request.bill_discount,
    )?;
    if expected.grand_total.is_negative() {
        return Err(CoreError::invalid(format!(
            "bill discount {} exceeds bill amount {}",
            request.bill_discount,
            expected.item_total + expected.gst_total
        ))
        .into());
    }

    // Writes start here.
    let bill_id = insert_bill_skeleton(conn, tenant_id, actor, request).await?;
    debug!(bill_id, "Bill skeleton inserted");

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        items.push(insert_item(conn, bill_id, line).await?);
    }

    let reason = bill_id.to_string();
    for (index, line) in lines.iter().enumerate() {
        let quantity = line.priced.quantity;
        if !decrease_stock(conn, tenant_id, line.product.id, quantity).await? {
            return Err(insufficient(index, line.product, line.product.current_stock, quantity));
        }

        let movement = NewMovement::new(line.product.id, MovementType::Sale, quantity, REFERENCE_BILL)
            .reason(reason.as_str());
        insert_movement(conn, tenant_id, &movement).await?;
    }

    let totals = BillTotals::from_items(&items, request.bill_discount)?;
    debug_assert_eq!(totals, expected);
    let bill = finalize_bill(conn, tenant_id, bill_id, &totals).await?;

    if request.payment_type.is_credit() {
        if let Some(customer_id) = request.customer_id {
            change_balance(conn, tenant_id, customer_id, totals.grand_total).await?;
            debug!(customer_id, amount = %totals.grand_total, "Credit sale added to balance");
        }
    }

    Ok(BillWithItems { bill, items })
}

/// Loads every referenced product of the tenant in primary-key order.
async fn load_products(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    request: &SaleRequest,
) -> LedgerResult<HashMap<ProductId, Product>> {
    let mut ids: Vec<ProductId> = request.items.iter().map(|item| item.product_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM products WHERE tenant_id = ");
    query.push_bind(tenant_id);
    query.push(" AND id IN (");
    let mut separated = query.separated(", ");
    for id in &ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY id");

    let products = query
        .build_query_as::<Product>()
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    Ok(products)
}

/// Checks every line in request order without writing anything.
///
/// The same product on several lines draws from one running remainder, so
/// the first line that no longer fits is the one reported.
fn check_lines<'a>(
    products: &'a HashMap<ProductId, Product>,
    request: &SaleRequest,
) -> LedgerResult<Vec<CheckedLine<'a>>> {
    // Unknown products fail the whole request before any stock check.
    for item in &request.items {
        if !products.contains_key(&item.product_id) {
            return Err(LedgerError::not_found("Product", item.product_id));
        }
    }

    let mut remaining: HashMap<ProductId, i64> =
        products.values().map(|p| (p.id, p.current_stock)).collect();
    let mut lines = Vec::with_capacity(request.items.len());

    for (index, item) in request.items.iter().enumerate() {
        let product = products
            .get(&item.product_id)
            .ok_or_else(|| LedgerError::not_found("Product", item.product_id))?;

        if product.status == ProductStatus::Inactive {
            return Err(CoreError::invalid_line(index, format!("product {} is not for sale", product.sku)).into());
        }

        let available = remaining.entry(product.id).or_insert(product.current_stock);
        if *available < item.quantity {
            return Err(insufficient(index, product, *available, item.quantity));
        }
        *available -= item.quantity;

        let priced = PricedLine::resolve(index, item, product.selling_price(), product.gst_rate())?;
        lines.push(CheckedLine { product, priced });
    }

    Ok(lines)
}

fn insufficient(line: usize, product: &Product, available: i64, requested: i64) -> LedgerError {
    CoreError::InsufficientStock {
        line,
        product_id: product.id,
        sku: product.sku.clone(),
        available,
        requested,
    }
    .into()
}

async fn insert_bill_skeleton(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    actor: Option<StaffId>,
    request: &SaleRequest,
) -> LedgerResult<BillId> {
    let customer_id: Option<CustomerId> = request.customer_id;

    let bill_id: BillId = sqlx::query_scalar(
        r#"
        INSERT INTO bills (
            tenant_id, customer_id, created_by,
            item_total_cents, bill_discount_cents, gst_total_cents, grand_total_cents,
            payment_type, created_at
        ) VALUES (?1, ?2, ?3, 0, ?4, 0, 0, ?5, ?6)
        RETURNING id
        "#,
    )
    .bind(tenant_id)
    .bind(customer_id)
    .bind(actor)
    .bind(request.bill_discount.cents())
    .bind(request.payment_type)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;

    Ok(bill_id)
}

async fn insert_item(conn: &mut SqliteConnection, bill_id: BillId, line: &CheckedLine<'_>) -> LedgerResult<BillItem> {
    let priced = &line.priced;

    let item = sqlx::query_as::<_, BillItem>(
        r#"
        INSERT INTO bill_items (
            bill_id, product_id, quantity, price_cents, discount_cents, subtotal_cents, gst_bps
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING *
        "#,
    )
    .bind(bill_id)
    .bind(line.product.id)
    .bind(priced.quantity)
    .bind(priced.price.cents())
    .bind(priced.discount.cents())
    .bind(priced.subtotal()?.cents())
    .bind(priced.gst.bps())
    .fetch_one(conn)
    .await?;

    Ok(item)
}

/// Writes the totals recomputed from the persisted items.
async fn finalize_bill(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    bill_id: BillId,
    totals: &BillTotals,
) -> LedgerResult<Bill> {
    let bill = sqlx::query_as::<_, Bill>(
        r#"
        UPDATE bills SET
            item_total_cents = ?3,
            gst_total_cents = ?4,
            grand_total_cents = ?5
        WHERE id = ?1 AND tenant_id = ?2
        RETURNING *
        "#,
    )
    .bind(bill_id)
    .bind(tenant_id)
    .bind(totals.item_total.cents())
    .bind(totals.gst_total.cents())
    .bind(totals.grand_total.cents())
    .fetch_one(conn)
    .await?;

    Ok(bill)
}
