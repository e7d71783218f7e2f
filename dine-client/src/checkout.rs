//! Checkout flow
//!
//! Submits the cart for the diner's table. At most one submission runs at
//! a time; the cart is cleared only once the server accepted it, so any
//! failure leaves it untouched for a retry.

use crate::backend::DineBackend;
use crate::cart::CartStore;
use crate::error::ClientError;
use crate::table_context::TableContext;
use parking_lot::Mutex;
use shared::error::ErrorCode;
use shared::models::SubmitReceipt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("A submission is already in progress")]
    InFlight,

    #[error(transparent)]
    Rejected(#[from] ClientError),
}

impl CheckoutError {
    /// The table was paid; the diner has to scan the QR code again
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Rejected(e) if e.code() == Some(ErrorCode::TableSessionExpired))
    }
}

/// Clears the in-flight flag when dropped
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Cart submission with a processing guard
pub struct CheckoutFlow {
    backend: Arc<dyn DineBackend>,
    cart: Arc<Mutex<CartStore>>,
    in_flight: AtomicBool,
}

impl CheckoutFlow {
    pub fn new(backend: Arc<dyn DineBackend>, cart: Arc<Mutex<CartStore>>) -> Self {
        Self {
            backend,
            cart,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn cart(&self) -> &Arc<Mutex<CartStore>> {
        &self.cart
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit the current cart for `table`
    pub async fn submit(&self, table: TableContext) -> Result<SubmitReceipt, CheckoutError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(CheckoutError::InFlight)?;

        let submission = {
            let cart = self.cart.lock();
            if cart.is_empty() {
                return Err(CheckoutError::EmptyCart);
            }
            cart.to_submission(Some(table.number))
        };

        match self.backend.submit_cart(table.number, &submission).await {
            Ok(receipt) => {
                self.cart.lock().clear();
                tracing::info!(
                    table_number = table.number,
                    order_id = %receipt.order.id,
                    merged = receipt.merged,
                    "Order submitted"
                );
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!(table_number = table.number, error = %e, "Order submission failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientResult;
    use async_trait::async_trait;
    use http::Method;
    use serde_json::{Value, json};
    use shared::error::AppError;
    use shared::message::{ChangeFilter, RealtimeFrame};
    use shared::models::CartItem;
    use tokio::sync::{Notify, mpsc};

    /// Answers order submissions once `gate` is notified
    struct GatedBackend {
        gate: Notify,
        reply: Mutex<Option<ClientResult<Value>>>,
    }

    impl GatedBackend {
        fn new(reply: ClientResult<Value>) -> Arc<Self> {
            Arc::new(Self {
                gate: Notify::new(),
                reply: Mutex::new(Some(reply)),
            })
        }
    }

    #[async_trait]
    impl DineBackend for GatedBackend {
        async fn request(&self, method: Method, path: &str, _: Option<Value>) -> ClientResult<Value> {
            assert_eq!(method, Method::POST);
            assert_eq!(path, "/api/orders?table=5");
            self.gate.notified().await;
            self.reply
                .lock()
                .take()
                .unwrap_or_else(|| Err(ClientError::InvalidResponse("no reply".into())))
        }

        async fn subscribe(
            &self,
            _: ChangeFilter,
            _: Option<u64>,
        ) -> ClientResult<mpsc::Receiver<RealtimeFrame>> {
            Err(ClientError::Channel("unsupported".into()))
        }

        fn set_token(&self, _: Option<String>) {}

        fn token(&self) -> Option<String> {
            None
        }
    }

    fn receipt() -> Value {
        json!({
            "order": {
                "id": "o1", "table_number": 5, "status": "pending",
                "total_amount": 10.0, "created_at": 0, "updated_at": 0
            },
            "merged": false,
            "items_added": 1
        })
    }

    fn filled_cart() -> Arc<Mutex<CartStore>> {
        let mut cart = CartStore::new();
        cart.add_item(CartItem {
            id: "burger".into(),
            name: "Burger".into(),
            price: 10.0,
            quantity: 1,
        });
        Arc::new(Mutex::new(cart))
    }

    const TABLE: TableContext = TableContext { number: 5 };

    #[tokio::test]
    async fn test_second_submit_while_in_flight() {
        let backend = GatedBackend::new(Ok(receipt()));
        let flow = Arc::new(CheckoutFlow::new(backend.clone(), filled_cart()));

        let first = tokio::spawn({
            let flow = flow.clone();
            async move { flow.submit(TABLE).await }
        });
        while !flow.is_in_flight() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(flow.submit(TABLE).await, Err(CheckoutError::InFlight)));

        backend.gate.notify_one();
        let receipt = first.await.unwrap().unwrap();
        assert_eq!(receipt.order.id, "o1");
        assert!(flow.cart().lock().is_empty());
        assert!(!flow.is_in_flight());
    }

    #[tokio::test]
    async fn test_failure_keeps_cart() {
        let backend = GatedBackend::new(Err(AppError::new(ErrorCode::TableSessionExpired).into()));
        backend.gate.notify_one();
        let flow = CheckoutFlow::new(backend, filled_cart());

        let err = flow.submit(TABLE).await.unwrap_err();
        assert!(err.is_session_expired());
        assert_eq!(flow.cart().lock().items().len(), 1);
        assert!(!flow.is_in_flight());
    }

    #[tokio::test]
    async fn test_empty_cart_rejected_locally() {
        let backend = GatedBackend::new(Ok(receipt()));
        let flow = CheckoutFlow::new(backend, Arc::new(Mutex::new(CartStore::new())));
        assert!(matches!(flow.submit(TABLE).await, Err(CheckoutError::EmptyCart)));
    }
}
