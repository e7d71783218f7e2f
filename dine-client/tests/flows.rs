//! Diner and staff flows against an in-process server

mod common;

use common::{client_config, create_test_env};
use dine_client::{
    AdminAlert, AdminListener, AuthContext, CartItem, CartStore, CheckoutError, CheckoutFlow,
    DineBackend, MemoryTableCache, SessionEnd, SessionView, SessionWatcher, TableContext,
};
use parking_lot::Mutex;
use shared::error::ErrorCode;
use shared::models::{OrderStatus, Role, TableStatus};
use std::sync::Arc;
use std::time::Duration;

fn line(id: &str, price: f64) -> CartItem {
    CartItem {
        id: id.into(),
        name: id.into(),
        price,
        quantity: 1,
    }
}

fn checkout(backend: Arc<dyn DineBackend>, lines: &[(&str, f64)]) -> CheckoutFlow {
    let mut cart = CartStore::new();
    for (id, price) in lines {
        cart.add_item(line(id, *price));
    }
    CheckoutFlow::new(backend, Arc::new(Mutex::new(cart)))
}

async fn wait_for_view<F>(watcher: &SessionWatcher, predicate: F) -> SessionView
where
    F: Fn(&SessionView) -> bool,
{
    let mut rx = watcher.watch();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if predicate(&rx.borrow_and_update()) {
                return rx.borrow().clone();
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("session view never matched")
}

#[tokio::test]
async fn test_two_diners_share_one_pending_order() {
    let env = create_test_env();
    env.seed(&[5]).await;

    let cache = MemoryTableCache::new();
    let table = TableContext::resolve("http://diner.test/menu?table=5", &cache).unwrap();

    let first = checkout(env.diner(), &[("burger", 10.0)]);
    let second = checkout(env.diner(), &[("soda", 2.5)]);
    second.cart().lock().update_quantity("soda", 2);

    let a = first.submit(table).await.unwrap();
    let b = second.submit(table).await.unwrap();

    assert!(!a.merged);
    assert!(b.merged);
    assert_eq!(a.order.id, b.order.id);
    assert_eq!(b.order.total_amount, 15.0);
    assert!(first.cart().lock().is_empty());
    assert!(second.cart().lock().is_empty());

    let status = env.diner().table_status(5).await.unwrap();
    assert_eq!(status.status, TableStatus::Occupied);
}

#[tokio::test]
async fn test_session_ends_after_payment() {
    let env = create_test_env();
    env.seed(&[5]).await;
    let config = client_config();

    let mut watcher = SessionWatcher::spawn(env.diner(), 5, &config);
    let flow = checkout(env.diner(), &[("burger", 10.0)]);
    let receipt = flow.submit(TableContext { number: 5 }).await.unwrap();

    let view = wait_for_view(&watcher, |v| v.order.is_some()).await;
    assert_eq!(view.order.unwrap().order.id, receipt.order.id);

    let change = env
        .staff()
        .set_order_status(&receipt.order.id, OrderStatus::Paid)
        .await
        .unwrap();
    assert_eq!(change.table.map(|t| t.status), Some(TableStatus::Available));

    let end = tokio::time::timeout(Duration::from_secs(5), watcher.ended())
        .await
        .unwrap();
    assert_eq!(
        end,
        Some(SessionEnd::OrderClosed {
            order_id: receipt.order.id.clone()
        })
    );

    let view = watcher.view();
    assert!(view.order.is_none());
    assert_eq!(view.table.map(|t| t.status), Some(TableStatus::Available));
}

#[tokio::test]
async fn test_new_order_does_not_end_running_session() {
    let env = create_test_env();
    env.seed(&[5]).await;
    let config = client_config();

    let mut watcher = SessionWatcher::spawn(env.diner(), 5, &config);
    let first = checkout(env.diner(), &[("burger", 10.0)])
        .submit(TableContext { number: 5 })
        .await
        .unwrap();
    wait_for_view(&watcher, |v| {
        v.order.as_ref().is_some_and(|o| o.order.id == first.order.id)
    })
    .await;

    env.staff()
        .set_order_status(&first.order.id, OrderStatus::Preparing)
        .await
        .unwrap();
    let second = checkout(env.diner(), &[("soda", 2.5)])
        .submit(TableContext { number: 5 })
        .await
        .unwrap();
    assert!(!second.merged);

    let view = wait_for_view(&watcher, |v| {
        v.order.as_ref().is_some_and(|o| o.order.id == second.order.id)
    })
    .await;
    assert_eq!(view.table.map(|t| t.status), Some(TableStatus::Occupied));

    // Several poll rounds pass without an end
    let quiet = tokio::time::timeout(Duration::from_millis(400), watcher.ended()).await;
    assert!(quiet.is_err(), "unexpected session end: {:?}", quiet);

    // Paying the running order releases the table and ends the session
    env.staff()
        .set_order_status(&second.order.id, OrderStatus::Paid)
        .await
        .unwrap();
    let end = tokio::time::timeout(Duration::from_secs(5), watcher.ended())
        .await
        .unwrap();
    assert_eq!(
        end,
        Some(SessionEnd::OrderClosed {
            order_id: second.order.id.clone()
        })
    );
}

#[tokio::test]
async fn test_paid_table_rejects_checkout() {
    let env = create_test_env();
    env.seed(&[8]).await;
    env.staff().toggle_table(8, TableStatus::Paid).await.unwrap();

    let flow = checkout(env.diner(), &[("burger", 10.0)]);
    let err = flow.submit(TableContext { number: 8 }).await.unwrap_err();
    assert!(err.is_session_expired());
    // Cart kept for after the re-scan
    assert_eq!(flow.cart().lock().items().len(), 1);

    let flow = checkout(env.diner(), &[("burger", 10.0)]);
    let err = flow.submit(TableContext { number: 99 }).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Rejected(e) if e.code() == Some(ErrorCode::TableNotFound)
    ));
}

#[tokio::test]
async fn test_admin_receives_alerts() {
    let env = create_test_env();
    env.seed(&[3]).await;
    let config = client_config();

    let auth = AuthContext::new(env.diner());
    let user = auth
        .set_session(Some(env.admin_token.clone()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.role, Role::Admin);

    let mut listener = AdminListener::start(&auth, &config).unwrap();
    // Let both subscriptions attach
    tokio::time::sleep(Duration::from_millis(50)).await;

    let receipt = checkout(env.diner(), &[("burger", 10.0)])
        .submit(TableContext { number: 3 })
        .await
        .unwrap();
    env.diner().call_waiter(3).await.unwrap();

    let mut alerts = Vec::new();
    for _ in 0..2 {
        let alert = tokio::time::timeout(Duration::from_secs(5), listener.next_alert())
            .await
            .unwrap()
            .unwrap();
        alerts.push(alert);
    }
    assert!(alerts.contains(&AdminAlert::NewOrder {
        table_number: 3,
        order_id: receipt.order.id.clone(),
    }));
    assert!(alerts.contains(&AdminAlert::WaiterNeeded { table_number: 3 }));
}

#[tokio::test]
async fn test_role_follows_session_changes() {
    let env = create_test_env();
    let config = client_config();
    let auth = AuthContext::new(env.diner());

    let user = auth
        .set_session(Some(env.customer_token.clone()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.role, Role::Customer);
    let err = AdminListener::start(&auth, &config).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::AdminRequired));

    auth.set_session(Some(env.admin_token.clone())).await.unwrap();
    assert!(auth.is_admin());

    auth.set_session(None).await.unwrap();
    assert_eq!(auth.current(), None);
    let err = AdminListener::start(&auth, &config).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NotAuthenticated));

    let err = auth
        .set_session(Some("not-a-token".into()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::TokenInvalid));
    assert!(!auth.is_admin());
}
