use std::time::Duration;

use bookstore_order_api::{
    config::GatewayConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        cart::AddToCartRequest,
        orders::{CancelOrderRequest, CreateOrderRequest, OrderLineRequest, UpdateOrderStatusRequest},
        payments::{PaymentAttemptRequest, PaymentOrderRequest},
    },
    entity::{
        books::ActiveModel as BookActive,
        order_lines::{Column as OrderLineCol, Entity as OrderLines},
        orders::Entity as Orders,
        payments::{Column as PaymentCol, Entity as Payments},
        stock_entries::{Column as StockCol, Entity as StockEntries},
    },
    error::AppError,
    gateway::GatewayClient,
    middleware::auth::AuthUser,
    models::{OrderStatus, PaymentStatus, StockDirection},
    routes::params::Pagination,
    services::{cart_service, order_service, payment_service, stock_service},
    state::AppState,
};
use bookstore_order_api::dto::stock::StockInboundRequest;
use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set, Statement};

const ISBN_A: &str = "9780000000011";
const ISBN_B: &str = "9780000000028";

// Integration flow over the whole order/payment/stock core: checkout pricing,
// payment retries and settlement, admin fulfilment with ledger deduction, and
// the cancellation paths.
#[tokio::test]
async fn order_payment_stock_lifecycle_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    seed_book(&state, ISBN_A, "Effective Java", 8000).await?;
    seed_book(&state, ISBN_B, "The Rust Programming Language", 5000).await?;

    let customer = AuthUser {
        account_id: "acc-1".into(),
        role: "user".into(),
    };
    let admin = AuthUser {
        account_id: "admin-1".into(),
        role: "admin".into(),
    };

    // --- creation and server-side re-pricing -----------------------------

    // 2 x 8000 + 1 x 5000 = 21000 >= 20000, so shipping is free.
    let created = order_service::create_order(
        &state,
        &customer,
        order_request("O-1", &[(ISBN_A, 2, 8000), (ISBN_B, 1, 5000)]),
    )
    .await?;
    let created = created.data.expect("order created");
    assert_eq!(created.subtotal, 21_000);
    assert_eq!(created.shipping_fee, 0);
    assert_eq!(created.total_paid, 21_000);

    let header = Orders::find_by_id(("O-1".to_string(), customer.account_id.clone()))
        .one(&state.orm)
        .await?
        .expect("order persisted");
    assert_eq!(header.status, OrderStatus::Requested);
    assert_eq!(header.total_paid, 21_000);
    assert_eq!(header.total_line_count, 2);
    assert_eq!(header.total_quantity, 3);

    // Re-submitting the same order id must be rejected.
    let duplicate = order_service::create_order(
        &state,
        &customer,
        order_request("O-1", &[(ISBN_A, 1, 8000)]),
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    // A tampered unit price aborts the whole creation with no partial rows.
    let tampered = order_service::create_order(
        &state,
        &customer,
        order_request("O-2", &[(ISBN_A, 2, 1), (ISBN_B, 1, 5000)]),
    )
    .await;
    assert!(matches!(tampered, Err(AppError::BadRequest(_))));
    assert!(
        Orders::find_by_id(("O-2".to_string(), customer.account_id.clone()))
            .one(&state.orm)
            .await?
            .is_none()
    );
    assert_eq!(
        OrderLines::find()
            .filter(OrderLineCol::OrderId.eq("O-2"))
            .count(&state.orm)
            .await?,
        0
    );

    // A shipping fee applies below the free threshold.
    let small = order_service::create_order(
        &state,
        &customer,
        order_request("O-small", &[(ISBN_B, 1, 5000)]),
    )
    .await?
    .data
    .expect("small order");
    assert_eq!(small.shipping_fee, 3_000);
    assert_eq!(small.total_paid, 8_000);

    // --- payment retries and settlement ----------------------------------

    payment_service::record_attempt(&state, &customer, attempt_request("O-1", "P-1", "KP")).await?;
    // Second attempt before the first resolves: P-1 flips to FAILED.
    payment_service::record_attempt(&state, &customer, attempt_request("O-1", "P-2", "AC")).await?;

    let p1 = find_payment(&state, "P-1", "O-1", &customer).await?;
    let p2 = find_payment(&state, "P-2", "O-1", &customer).await?;
    assert_eq!(p1.status, PaymentStatus::Failed);
    assert_eq!(p2.status, PaymentStatus::Attempt);
    assert_eq!(count_attempts(&state, "O-1", &customer).await?, 1);

    // Duplicate payment ids are rejected.
    let dup_payment =
        payment_service::record_attempt(&state, &customer, attempt_request("O-1", "P-2", "KP"))
            .await;
    assert!(matches!(dup_payment, Err(AppError::BadRequest(_))));

    // Cart the first book so settlement can drain it.
    cart_service::add_to_cart(
        &state.pool,
        &customer,
        AddToCartRequest {
            isbn: ISBN_A.into(),
            quantity: 2,
        },
    )
    .await?;

    payment_service::complete_payment(
        &state,
        &customer,
        PaymentOrderRequest {
            order_id: "O-1".into(),
        },
    )
    .await?;

    let header = Orders::find_by_id(("O-1".to_string(), customer.account_id.clone()))
        .one(&state.orm)
        .await?
        .expect("order");
    assert_eq!(header.status, OrderStatus::Completed);
    let p2 = find_payment(&state, "P-2", "O-1", &customer).await?;
    assert_eq!(p2.status, PaymentStatus::Completed);
    let p1 = find_payment(&state, "P-1", "O-1", &customer).await?;
    assert_eq!(p1.status, PaymentStatus::Failed);

    let cart = cart_service::list_cart(
        &state.pool,
        &customer,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    assert!(cart.data.expect("cart").items.is_empty(), "cart drained");

    // Settlement is idempotent: re-invoking changes nothing and is no error.
    let again = payment_service::complete_payment(
        &state,
        &customer,
        PaymentOrderRequest {
            order_id: "O-1".into(),
        },
    )
    .await?;
    assert!(again.success);
    assert_eq!(
        Payments::find()
            .filter(PaymentCol::OrderId.eq("O-1"))
            .filter(PaymentCol::Status.eq(PaymentStatus::Completed))
            .count(&state.orm)
            .await?,
        1
    );

    // --- fulfilment: stock ledger deduction ------------------------------

    stock_service::record_inbound(
        &state,
        &admin,
        StockInboundRequest {
            isbn: ISBN_A.into(),
            quantity: 5,
        },
    )
    .await?;
    stock_service::record_inbound(
        &state,
        &admin,
        StockInboundRequest {
            isbn: ISBN_B.into(),
            quantity: 1,
        },
    )
    .await?;
    assert_eq!(stock_service::current_stock(&state.orm, ISBN_A).await?, 5);
    assert_eq!(stock_service::current_stock(&state.orm, ISBN_B).await?, 1);

    // Non-admin principals cannot drive fulfilment.
    let forbidden = order_service::transition_status(
        &state,
        &customer,
        status_request("O-1", &customer.account_id, "PREPARING"),
    )
    .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    order_service::transition_status(
        &state,
        &admin,
        status_request("O-1", &customer.account_id, "PREPARING"),
    )
    .await?;

    let out_a = StockEntries::find()
        .filter(StockCol::Isbn.eq(ISBN_A))
        .filter(StockCol::Direction.eq(StockDirection::Outbound))
        .all(&state.orm)
        .await?;
    assert_eq!(out_a.len(), 1);
    assert_eq!(out_a[0].quantity, 2);
    assert_eq!(out_a[0].quantity_before, 5);
    assert_eq!(out_a[0].quantity_after, 3);
    assert_eq!(stock_service::current_stock(&state.orm, ISBN_A).await?, 3);
    assert_eq!(stock_service::current_stock(&state.orm, ISBN_B).await?, 0);

    // Insufficient stock on any line aborts the whole transition.
    order_service::create_order(
        &state,
        &customer,
        order_request("O-big", &[(ISBN_A, 10, 8000)]),
    )
    .await?;
    payment_service::record_attempt(&state, &customer, attempt_request("O-big", "P-3", "KP"))
        .await?;
    payment_service::complete_payment(
        &state,
        &customer,
        PaymentOrderRequest {
            order_id: "O-big".into(),
        },
    )
    .await?;

    let entries_before = StockEntries::find().count(&state.orm).await?;
    let shortfall = order_service::transition_status(
        &state,
        &admin,
        status_request("O-big", &customer.account_id, "PREPARING"),
    )
    .await;
    assert!(matches!(shortfall, Err(AppError::BadRequest(_))));
    let header = Orders::find_by_id(("O-big".to_string(), customer.account_id.clone()))
        .one(&state.orm)
        .await?
        .expect("order");
    assert_eq!(header.status, OrderStatus::Completed, "status rolled back");
    assert_eq!(
        StockEntries::find().count(&state.orm).await?,
        entries_before,
        "no partial ledger writes"
    );

    // Transition table rejects skipping ahead.
    let skip = order_service::transition_status(
        &state,
        &admin,
        status_request("O-big", &customer.account_id, "SHIPPING"),
    )
    .await;
    assert!(matches!(skip, Err(AppError::BadRequest(_))));

    // O-1 continues down the happy path to the terminal state.
    order_service::transition_status(
        &state,
        &admin,
        status_request("O-1", &customer.account_id, "SHIPPING"),
    )
    .await?;
    order_service::transition_status(
        &state,
        &admin,
        status_request("O-1", &customer.account_id, "DELIVERED"),
    )
    .await?;
    let stuck = order_service::transition_status(
        &state,
        &admin,
        status_request("O-1", &customer.account_id, "SHIPPING"),
    )
    .await;
    assert!(matches!(stuck, Err(AppError::BadRequest(_))));

    // --- failure and cancellation paths ----------------------------------

    // Gateway failure keeps the order open for a retry.
    order_service::create_order(
        &state,
        &customer,
        order_request("O-retry", &[(ISBN_B, 1, 5000)]),
    )
    .await?;
    payment_service::record_attempt(&state, &customer, attempt_request("O-retry", "P-4", "KP"))
        .await?;
    payment_service::fail_payment(
        &state,
        &customer,
        PaymentOrderRequest {
            order_id: "O-retry".into(),
        },
    )
    .await?;
    let p4 = find_payment(&state, "P-4", "O-retry", &customer).await?;
    assert_eq!(p4.status, PaymentStatus::Failed);
    let header = Orders::find_by_id(("O-retry".to_string(), customer.account_id.clone()))
        .one(&state.orm)
        .await?
        .expect("order");
    assert_eq!(header.status, OrderStatus::Requested, "order stays open");

    // Completing with no live attempt left is a caller error.
    let no_attempt = payment_service::complete_payment(
        &state,
        &customer,
        PaymentOrderRequest {
            order_id: "O-retry".into(),
        },
    )
    .await;
    assert!(matches!(no_attempt, Err(AppError::BadRequest(_))));

    // Explicit abort fails the order and any live attempt.
    payment_service::record_attempt(&state, &customer, attempt_request("O-retry", "P-5", "AC"))
        .await?;
    order_service::cancel_order(
        &state,
        &customer,
        CancelOrderRequest {
            order_id: "O-retry".into(),
        },
    )
    .await?;
    let header = Orders::find_by_id(("O-retry".to_string(), customer.account_id.clone()))
        .one(&state.orm)
        .await?
        .expect("order");
    assert_eq!(header.status, OrderStatus::Failed);
    let p5 = find_payment(&state, "P-5", "O-retry", &customer).await?;
    assert_eq!(p5.status, PaymentStatus::Failed);

    let again = order_service::cancel_order(
        &state,
        &customer,
        CancelOrderRequest {
            order_id: "O-retry".into(),
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));

    // Admin-driven FAILED also clears live attempts, leaving settled ones.
    order_service::create_order(
        &state,
        &customer,
        order_request("O-fail", &[(ISBN_B, 1, 5000)]),
    )
    .await?;
    payment_service::record_attempt(&state, &customer, attempt_request("O-fail", "P-6", "KP"))
        .await?;
    order_service::transition_status(
        &state,
        &admin,
        status_request("O-fail", &customer.account_id, "FAILED"),
    )
    .await?;
    let p6 = find_payment(&state, "P-6", "O-fail", &customer).await?;
    assert_eq!(p6.status, PaymentStatus::Failed);
    let p2 = find_payment(&state, "P-2", "O-1", &customer).await?;
    assert_eq!(p2.status, PaymentStatus::Completed, "settled rows untouched");

    // Customer cancellation is only legal from COMPLETED.
    let premature = order_service::cancel_completed_order(
        &state,
        &customer,
        CancelOrderRequest {
            order_id: "O-fail".into(),
        },
    )
    .await;
    assert!(matches!(premature, Err(AppError::BadRequest(_))));

    order_service::create_order(
        &state,
        &customer,
        order_request("O-cancel", &[(ISBN_B, 1, 5000)]),
    )
    .await?;
    payment_service::record_attempt(&state, &customer, attempt_request("O-cancel", "P-7", "KP"))
        .await?;
    payment_service::complete_payment(
        &state,
        &customer,
        PaymentOrderRequest {
            order_id: "O-cancel".into(),
        },
    )
    .await?;
    order_service::cancel_completed_order(
        &state,
        &customer,
        CancelOrderRequest {
            order_id: "O-cancel".into(),
        },
    )
    .await?;
    let header = Orders::find_by_id(("O-cancel".to_string(), customer.account_id.clone()))
        .one(&state.orm)
        .await?
        .expect("order");
    assert_eq!(header.status, OrderStatus::Cancelled);

    let twice = order_service::cancel_completed_order(
        &state,
        &customer,
        CancelOrderRequest {
            order_id: "O-cancel".into(),
        },
    )
    .await;
    assert!(matches!(twice, Err(AppError::BadRequest(_))));

    // --- read side --------------------------------------------------------

    let summary = order_service::get_order(&state, &customer, "O-1").await?;
    let summary = summary.data.expect("summary");
    assert_eq!(summary.subtotal, 21_000);
    assert_eq!(summary.shipping_fee, 0);
    assert_eq!(summary.lines.len(), 2);
    assert_eq!(
        summary.payment.expect("latest payment").status,
        PaymentStatus::Completed
    );

    let history = stock_service::stock_history(
        &state,
        &admin,
        ISBN_A,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    let history = history.data.expect("history");
    assert_eq!(history.current_stock, 3);
    assert_eq!(history.entries.len(), 2, "one inbound, one outbound");

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE payments, order_lines, orders, stock_entries, cart_items, audit_logs, books RESTART IDENTITY CASCADE",
    ))
    .await?;

    let gateway = GatewayClient::new(GatewayConfig {
        base_url: "http://127.0.0.1:9".into(),
        cid: "TC0ONETIME".into(),
        secret_key: String::new(),
        public_base_url: "http://localhost:3000".into(),
        timeout: Duration::from_secs(1),
    })?;

    Ok(AppState { pool, orm, gateway })
}

async fn seed_book(state: &AppState, isbn: &str, title: &str, price: i64) -> anyhow::Result<()> {
    BookActive {
        isbn: Set(isbn.to_string()),
        title: Set(title.to_string()),
        author: Set("Test Author".to_string()),
        price: Set(price),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(())
}

fn order_request(order_id: &str, lines: &[(&str, i32, i64)]) -> CreateOrderRequest {
    CreateOrderRequest {
        order_id: order_id.to_string(),
        order_date: Some(Utc::now()),
        lines: lines
            .iter()
            .map(|(isbn, quantity, unit_price)| OrderLineRequest {
                isbn: isbn.to_string(),
                quantity: *quantity,
                unit_price: *unit_price,
                line_total: unit_price * i64::from(*quantity),
            })
            .collect(),
    }
}

fn attempt_request(order_id: &str, payment_id: &str, method: &str) -> PaymentAttemptRequest {
    PaymentAttemptRequest {
        order_id: order_id.to_string(),
        payment_id: payment_id.to_string(),
        method: method.to_string(),
        attempted_at: Utc::now(),
    }
}

fn status_request(order_id: &str, account_id: &str, status: &str) -> UpdateOrderStatusRequest {
    UpdateOrderStatusRequest {
        order_id: order_id.to_string(),
        account_id: account_id.to_string(),
        status: status.to_string(),
    }
}

async fn find_payment(
    state: &AppState,
    payment_id: &str,
    order_id: &str,
    user: &AuthUser,
) -> anyhow::Result<bookstore_order_api::entity::payments::Model> {
    Payments::find_by_id((
        payment_id.to_string(),
        order_id.to_string(),
        user.account_id.clone(),
    ))
    .one(&state.orm)
    .await?
    .ok_or_else(|| anyhow::anyhow!("payment {payment_id} not found"))
}

async fn count_attempts(state: &AppState, order_id: &str, user: &AuthUser) -> anyhow::Result<u64> {
    let count = Payments::find()
        .filter(PaymentCol::OrderId.eq(order_id))
        .filter(PaymentCol::AccountId.eq(&user.account_id))
        .filter(PaymentCol::Status.eq(PaymentStatus::Attempt))
        .count(&state.orm)
        .await?;
    Ok(count)
}
