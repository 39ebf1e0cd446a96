//! End-to-end ledger flows against a file-backed database.

mod common;

use kirana_core::{
    CustomerDetails, Money, MovementType, PaymentKind, PaymentType, SaleLine, SaleRequest,
    REFERENCE_BILL, REFERENCE_MANUAL_ADD, REFERENCE_OPENING_STOCK,
};
use kirana_db::{BillFilter, ErrorKind, MovementFilter, WriteTx};

use common::{count, product, tenant, ScratchDb};

#[tokio::test]
async fn test_store_day() {
    let scratch = ScratchDb::default_pool().await;
    let db = &scratch.db;
    let shop = tenant(db, "Sharma General Store").await;
    let cashier = db.staff().insert(shop.id, "Ravi", "Cashier").await.unwrap();
    let meena = db
        .customers()
        .insert(shop.id, CustomerDetails::new("Meena").phone("9876500001"))
        .await
        .unwrap();

    let soap = product(db, &shop, "SOAP-100G", 100, 18, 10).await;
    let bread = product(db, &shop, "BREAD-400G", 50, 0, 10).await;

    // Morning delivery.
    assert_eq!(db.stock().adjust_stock(shop.id, bread.id, 6, "Baker delivery").await.unwrap(), 16);

    // Cash sale with a line discount and a bill discount.
    let request = SaleRequest::new(
        PaymentType::Cash,
        vec![
            SaleLine::new(soap.id, 2),
            SaleLine::new(bread.id, 1).with_discount(Money::from_major(5)),
        ],
    )
    .with_bill_discount(Money::from_major(10));
    let cash_sale = db.billing().create_sale(shop.id, Some(cashier.id), request).await.unwrap();
    assert_eq!(cash_sale.bill.item_total(), Money::from_major(245));
    assert_eq!(cash_sale.bill.gst_total(), Money::from_major(36));
    assert_eq!(cash_sale.bill.grand_total(), Money::from_major(271));

    // Credit sale on Meena's account, then she pays part of it.
    let request = SaleRequest::new(PaymentType::Credit, vec![SaleLine::new(bread.id, 4)]).for_customer(meena.id);
    let credit_sale = db.billing().create_sale(shop.id, Some(cashier.id), request).await.unwrap();
    assert_eq!(credit_sale.bill.grand_total(), Money::from_major(200));

    db.customers()
        .record_payment(shop.id, meena.id, Money::from_major(150), PaymentKind::Credit)
        .await
        .unwrap();
    let meena = db.customers().get(shop.id, meena.id).await.unwrap();
    assert_eq!(meena.spending_balance(), Money::from_major(50));

    // Stock and ledgers line up.
    assert_eq!(db.products().get(shop.id, soap.id).await.unwrap().current_stock, 8);
    assert_eq!(db.products().get(shop.id, bread.id).await.unwrap().current_stock, 11);

    let history = db.stock().history(shop.id, bread.id).await.unwrap();
    let kinds: Vec<_> = history.iter().map(|m| (m.movement_type, m.quantity)).collect();
    assert_eq!(
        kinds,
        vec![
            (MovementType::Sale, 4),
            (MovementType::Sale, 1),
            (MovementType::In, 6),
            (MovementType::In, 10),
        ]
    );
    assert_eq!(history[0].reason, Some(credit_sale.bill.id.to_string()));
    assert_eq!(history[2].reference_type.as_deref(), Some(REFERENCE_MANUAL_ADD));
    assert_eq!(history[3].reference_type.as_deref(), Some(REFERENCE_OPENING_STOCK));

    for p in [&soap, &bread] {
        assert!(db.stock().reconcile(shop.id, p.id).await.unwrap().is_consistent());
    }

    let sales = db
        .stock()
        .movements(
            shop.id,
            &MovementFilter {
                movement_type: Some(MovementType::Sale),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(sales.len(), 3);
    assert!(sales.iter().all(|m| m.reference_type.as_deref() == Some(REFERENCE_BILL)));

    let bills = db.bills().list(shop.id, &BillFilter::default()).await.unwrap();
    assert_eq!(bills.len(), 2);
    assert_eq!(bills[0].id, credit_sale.bill.id);
    assert_eq!(bills[0].created_by, Some(cashier.id));
}

#[tokio::test]
async fn test_sequential_sales_stop_at_stock() {
    let scratch = ScratchDb::default_pool().await;
    let db = &scratch.db;
    let shop = tenant(db, "Ten Units").await;
    let dal = product(db, &shop, "DAL-1KG", 140, 5, 10).await;

    for _ in 0..2 {
        db.billing()
            .create_sale(shop.id, None, SaleRequest::new(PaymentType::Cash, vec![SaleLine::new(dal.id, 4)]))
            .await
            .unwrap();
    }

    let bills_before = count(db, "bills").await;
    let movements_before = count(db, "stock_movements").await;

    let err = db
        .billing()
        .create_sale(shop.id, None, SaleRequest::new(PaymentType::Cash, vec![SaleLine::new(dal.id, 3)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);

    assert_eq!(db.products().get(shop.id, dal.id).await.unwrap().current_stock, 2);
    assert_eq!(count(db, "bills").await, bills_before);
    assert_eq!(count(db, "stock_movements").await, movements_before);
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let scratch = ScratchDb::default_pool().await;
    let db = &scratch.db;
    let a = tenant(db, "Shop A").await;
    let b = tenant(db, "Shop B").await;
    let a_product = product(db, &a, "SHARED-SKU", 10, 0, 5).await;
    let b_product = product(db, &b, "SHARED-SKU", 10, 0, 5).await;
    let a_customer = db.customers().insert(a.id, CustomerDetails::new("A's customer")).await.unwrap();

    let err = db
        .billing()
        .create_sale(b.id, None, SaleRequest::new(PaymentType::Cash, vec![SaleLine::new(a_product.id, 1)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = db.stock().adjust_stock(b.id, a_product.id, 1, "wrong shop").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = db.stock().history(b.id, a_product.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = db
        .customers()
        .record_payment(b.id, a_customer.id, Money::from_major(1), PaymentKind::Debit)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(db.products().get(a.id, a_product.id).await.unwrap().current_stock, 5);
    assert_eq!(db.products().get(b.id, b_product.id).await.unwrap().current_stock, 5);
    assert_eq!(count(db, "bills").await, 0);
}

#[tokio::test]
async fn test_deleting_tenant_removes_everything() {
    let scratch = ScratchDb::default_pool().await;
    let db = &scratch.db;
    let gone = tenant(db, "Closing Down").await;
    let stays = tenant(db, "Still Open").await;

    for t in [&gone, &stays] {
        let p = product(db, t, "ITEM", 10, 0, 5).await;
        let c = db.customers().insert(t.id, CustomerDetails::new("Regular")).await.unwrap();
        let request = SaleRequest::new(PaymentType::Credit, vec![SaleLine::new(p.id, 2)]).for_customer(c.id);
        db.billing().create_sale(t.id, None, request).await.unwrap();
        db.customers()
            .record_payment(t.id, c.id, Money::from_major(5), PaymentKind::Credit)
            .await
            .unwrap();
    }

    db.tenants().delete(gone.id).await.unwrap();

    for table in ["products", "customers", "customer_payments", "bills", "bill_items"] {
        assert_eq!(count(db, table).await, 1, "table {table}");
    }
    // Opening stock and the sale.
    assert_eq!(count(db, "stock_movements").await, 2);
    assert!(db.bills().list(stays.id, &BillFilter::default()).await.unwrap().len() == 1);
}

#[tokio::test]
async fn test_dropped_transaction_is_discarded() {
    let scratch = ScratchDb::default_pool().await;
    let db = &scratch.db;
    let shop = tenant(db, "Dropped").await;

    {
        let mut tx = WriteTx::begin(db.pool()).await.unwrap();
        sqlx::query("INSERT INTO tenants (business_name, status, created_at) VALUES ('Ghost', 'active', CURRENT_TIMESTAMP)")
            .execute(&mut *tx)
            .await
            .unwrap();
        // Dropped without commit or rollback.
    }

    // The lock was released and the insert never became visible.
    let next = db.tenants().create("After").await.unwrap();
    assert!(next.id > shop.id);
    assert_eq!(count(db, "tenants").await, 2);
}
