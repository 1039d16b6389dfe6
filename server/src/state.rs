use std::sync::Arc;

use crate::service::OrderService;

/// Shared handler state. Cloned per request, so everything sits behind `Arc`.
pub struct AppState<P> {
    pub orders: Arc<OrderService<P>>,
}

impl<P> AppState<P> {
    pub fn new(orders: OrderService<P>) -> Self {
        Self {
            orders: Arc::new(orders),
        }
    }
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            orders: Arc::clone(&self.orders),
        }
    }
}
