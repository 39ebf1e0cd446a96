//! # Customer Ledger
//!
//! Customers and the payments recorded against their spending balance.
//!
//! ## Balance Direction
//! ```text
//! credit sale (BillingEngine)   balance += grand_total
//! PaymentKind::Debit            balance += amount
//! PaymentKind::Credit           balance -= amount   (customer paying down)
//! ```
//!
//! The balance is only written together with the event that explains it:
//! a payment row here, or a credit bill in the billing engine.

use chrono::Utc;
use kirana_core::validation::{validate_customer, validate_payment_amount};
use kirana_core::{Customer, CustomerDetails, CustomerId, CustomerPayment, Money, PaymentKind, TenantId};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbResult, LedgerError, LedgerResult};
use crate::repository::escape_like;
use crate::repository::tenant::ensure_tenant;
use crate::transaction::WriteTx;

/// Repository for customers and their payments.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Adds a customer with a zero balance.
    pub async fn insert(&self, tenant_id: TenantId, details: CustomerDetails) -> LedgerResult<Customer> {
        validate_customer(&details)?;
        debug!(tenant_id, name = %details.name, "Inserting customer");

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = insert_in(&mut tx, tenant_id, &details).await;
        tx.finish(result).await
    }

    /// Gets a customer of `tenant_id`.
    pub async fn get(&self, tenant_id: TenantId, id: CustomerId) -> LedgerResult<Customer> {
        find_customer(&self.pool, tenant_id, id).await
    }

    /// Customers whose phone number starts with `phone`. Wildcards in the
    /// input match literally.
    pub async fn search_by_phone(&self, tenant_id: TenantId, phone: &str) -> LedgerResult<Vec<Customer>> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Ok(Vec::new());
        }

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE tenant_id = ?1 AND phone LIKE ?2 ESCAPE '\'
            ORDER BY name, id
            "#,
        )
        .bind(tenant_id)
        .bind(format!("{}%", escape_like(phone)))
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Edits contact fields. The spending balance is never written here.
    pub async fn update_details(
        &self,
        tenant_id: TenantId,
        id: CustomerId,
        details: CustomerDetails,
    ) -> LedgerResult<Customer> {
        validate_customer(&details)?;

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                name = ?3,
                phone = ?4,
                email = ?5,
                gst_number = ?6,
                kind = ?7
            WHERE id = ?1 AND tenant_id = ?2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(details.name.trim())
        .bind(&details.phone)
        .bind(&details.email)
        .bind(&details.gst_number)
        .bind(details.kind.trim())
        .fetch_optional(&mut *tx)
        .await
        .map_err(LedgerError::from)
        .and_then(|row| row.ok_or_else(|| LedgerError::not_found("Customer", id)));

        tx.finish(result).await
    }

    /// Records a payment and applies it to the customer's balance.
    ///
    /// ## Example
    /// ```text
    /// balance 500.00
    ///   record_payment(200.00, Credit) → balance 300.00
    ///   record_payment( 50.00, Debit)  → balance 350.00
    /// ```
    ///
    /// ## Errors
    /// * kind `InvalidRequest` - `amount <= 0`
    /// * kind `NotFound` - customer missing or owned by another tenant
    pub async fn record_payment(
        &self,
        tenant_id: TenantId,
        customer_id: CustomerId,
        amount: Money,
        kind: PaymentKind,
    ) -> LedgerResult<CustomerPayment> {
        validate_payment_amount(amount)?;
        debug!(tenant_id, customer_id, %amount, ?kind, "Recording payment");

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = record_payment_in(&mut tx, tenant_id, customer_id, amount, kind).await;
        let payment = tx.finish(result).await?;

        info!(
            tenant_id,
            customer_id,
            payment_id = payment.id,
            amount = %amount,
            kind = ?kind,
            "Payment recorded"
        );
        Ok(payment)
    }

    /// Payments of a customer, newest first.
    pub async fn payments(&self, tenant_id: TenantId, customer_id: CustomerId) -> LedgerResult<Vec<CustomerPayment>> {
        find_customer(&self.pool, tenant_id, customer_id).await?;

        let payments = sqlx::query_as::<_, CustomerPayment>(
            r#"
            SELECT * FROM customer_payments
            WHERE tenant_id = ?1 AND customer_id = ?2
            ORDER BY id DESC
            "#,
        )
        .bind(tenant_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}

async fn insert_in(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    details: &CustomerDetails,
) -> LedgerResult<Customer> {
    ensure_tenant(conn, tenant_id).await?;

    let customer = sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (tenant_id, name, phone, email, gst_number, kind, spending_balance_cents, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
        RETURNING *
        "#,
    )
    .bind(tenant_id)
    .bind(details.name.trim())
    .bind(&details.phone)
    .bind(&details.email)
    .bind(&details.gst_number)
    .bind(details.kind.trim())
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;

    Ok(customer)
}

async fn record_payment_in(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    customer_id: CustomerId,
    amount: Money,
    kind: PaymentKind,
) -> LedgerResult<CustomerPayment> {
    find_customer(&mut *conn, tenant_id, customer_id).await?;

    let payment = sqlx::query_as::<_, CustomerPayment>(
        r#"
        INSERT INTO customer_payments (tenant_id, customer_id, amount_cents, kind, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING *
        "#,
    )
    .bind(tenant_id)
    .bind(customer_id)
    .bind(amount.cents())
    .bind(kind)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    change_balance(conn, tenant_id, customer_id, kind.balance_delta(amount)).await?;

    Ok(payment)
}

/// Adds `delta` to a customer's spending balance.
pub(crate) async fn change_balance(
    conn: &mut SqliteConnection,
    tenant_id: TenantId,
    customer_id: CustomerId,
    delta: Money,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE customers
        SET spending_balance_cents = spending_balance_cents + ?1
        WHERE id = ?2 AND tenant_id = ?3
        "#,
    )
    .bind(delta.cents())
    .bind(customer_id)
    .bind(tenant_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Looks up a customer inside the caller's tenant.
pub(crate) async fn find_customer<'e, E>(executor: E, tenant_id: TenantId, id: CustomerId) -> LedgerResult<Customer>
where
    E: sqlx::SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?1 AND tenant_id = ?2")
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| LedgerError::not_found("Customer", id))
}
