//! Guards that only hold inside PostgreSQL transactions.
//!
//! These need a running database configured through the usual `DB_*`
//! variables: `cargo test -p repository -- --ignored`.

use chrono::{NaiveDate, Utc};
use deadpool_postgres::Pool;
use model::{NewFeedback, NewOrder, NewUser, PaymentStatus, Role, SentimentScore, ServiceDraft};
use repository::{
    FeedbacksRepository, OrdersRepository, PaymentsRepository, PgFeedbacksRepository,
    PgOrdersRepository, PgPaymentsRepository, PgServicesRepository, PgUsersRepository,
    ServicesRepository, UsersRepository,
};

async fn pool() -> Pool {
    let mut cfg = app_config::AppConfig::load().unwrap();
    cfg.migrations_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../migrations").into();
    db::init_db_pool(&cfg).await.unwrap()
}

fn unique(prefix: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{prefix}{}x{nanos}", std::process::id())
}

/// Seeds a customer, an organizer with one service, and an order for it.
/// Returns `(customer_id, organizer_id, order_id)`.
async fn seed_order(pool: &Pool) -> (i64, i64, i64) {
    let users = PgUsersRepository::new(pool.clone());
    let mut ids = Vec::new();
    for role in [Role::Customer, Role::Organizer] {
        let username = unique(role.as_str());
        let user = users
            .insert(&NewUser {
                name: username.clone(),
                email: format!("{username}@example.com"),
                username,
                password_hash: "hash".into(),
                role,
            })
            .await
            .unwrap();
        ids.push(user.id);
    }
    let (customer_id, organizer_id) = (ids[0], ids[1]);

    let service = PgServicesRepository::new(pool.clone())
        .insert(
            organizer_id,
            &ServiceDraft {
                name: "Sound system".into(),
                cost: 150_000.0,
                phone: "0800".into(),
                email: "eo@example.com".into(),
                description: "speakers and mixer".into(),
                is_published: true,
            },
        )
        .await
        .unwrap();

    let order = PgOrdersRepository::new(pool.clone())
        .insert(&NewOrder {
            customer_id,
            provider_id: organizer_id,
            date_of_event: NaiveDate::from_ymd_opt(2022, 12, 12).unwrap(),
            first_name: "Example".into(),
            last_name: "Customer".into(),
            phone: "081234567890".into(),
            email: "customer@example.com".into(),
            address: "Jakarta".into(),
            note: "-".into(),
            service_ids: vec![service.id],
        })
        .await
        .unwrap();

    (customer_id, organizer_id, order.id)
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_accepts_open_one_payment() {
    let pool = pool().await;
    let (_, _, order_id) = seed_order(&pool).await;
    let orders = PgOrdersRepository::new(pool.clone());

    let (first, second) = tokio::join!(
        orders.accept(order_id, 150_000.0),
        orders.accept(order_id, 150_000.0)
    );
    let opened = [first.unwrap(), second.unwrap()]
        .into_iter()
        .flatten()
        .count();
    assert_eq!(opened, 1);

    let payments = PgPaymentsRepository::new(pool.clone())
        .find_by_order_ids(&[order_id])
        .await
        .unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatus::Pending);
    assert!(orders.find(order_id).await.unwrap().unwrap().is_accepted);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_revert_accept_allows_a_new_accept() {
    let pool = pool().await;
    let (_, _, order_id) = seed_order(&pool).await;
    let orders = PgOrdersRepository::new(pool.clone());
    let payments = PgPaymentsRepository::new(pool.clone());

    orders.accept(order_id, 150_000.0).await.unwrap().unwrap();
    assert!(orders.revert_accept(order_id).await.unwrap());
    assert!(!orders.revert_accept(order_id).await.unwrap());
    assert!(!orders.find(order_id).await.unwrap().unwrap().is_accepted);
    assert!(payments.find_by_order_id(order_id).await.unwrap().is_none());

    assert!(orders.accept(order_id, 150_000.0).await.unwrap().is_some());
    payments
        .settle(order_id, PaymentStatus::Success)
        .await
        .unwrap()
        .unwrap();
    assert!(!orders.revert_accept(order_id).await.unwrap());
    assert!(orders.find(order_id).await.unwrap().unwrap().is_accepted);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_settle_applies_once() {
    let pool = pool().await;
    let (_, _, order_id) = seed_order(&pool).await;
    let orders = PgOrdersRepository::new(pool.clone());
    let payments = PgPaymentsRepository::new(pool.clone());
    orders.accept(order_id, 150_000.0).await.unwrap().unwrap();

    let settled = payments
        .settle(order_id, PaymentStatus::Success)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.status, PaymentStatus::Success);

    let replay = payments.settle(order_id, PaymentStatus::Fail).await.unwrap();
    assert!(replay.is_none());
    assert!(orders.find(order_id).await.unwrap().is_some());
    assert_eq!(
        payments.find_by_order_id(order_id).await.unwrap().unwrap().status,
        PaymentStatus::Success
    );
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_failed_payment_cancels_order() {
    let pool = pool().await;
    let (_, _, order_id) = seed_order(&pool).await;
    let orders = PgOrdersRepository::new(pool.clone());
    orders.accept(order_id, 150_000.0).await.unwrap().unwrap();

    let failed = PgPaymentsRepository::new(pool.clone())
        .settle(order_id, PaymentStatus::Fail)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.status, PaymentStatus::Fail);
    assert!(orders.find(order_id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_one_feedback_per_completed_order() {
    let pool = pool().await;
    let (customer_id, organizer_id, order_id) = seed_order(&pool).await;
    let orders = PgOrdersRepository::new(pool.clone());
    let feedbacks = PgFeedbacksRepository::new(pool.clone());
    let feedback = NewFeedback {
        description: "great show".into(),
        rating: 5,
        sentiment: SentimentScore::from_polarity(0.8),
        from_user_id: customer_id,
        to_user_id: organizer_id,
    };

    assert!(feedbacks.insert_if_eligible(&feedback).await.unwrap().is_none());

    orders.accept(order_id, 150_000.0).await.unwrap().unwrap();
    assert!(orders.complete(order_id).await.unwrap());

    let (first, second) = tokio::join!(
        feedbacks.insert_if_eligible(&feedback),
        feedbacks.insert_if_eligible(&feedback)
    );
    let inserted = [first.unwrap(), second.unwrap()]
        .into_iter()
        .flatten()
        .count();
    assert_eq!(inserted, 1);
    assert_eq!(
        feedbacks.feedbacks_count(customer_id, organizer_id).await.unwrap(),
        1
    );
    assert!(feedbacks.insert_if_eligible(&feedback).await.unwrap().is_none());
}
