pub mod error;
pub mod order_service;

pub use error::{ErrorKind, OrderError};
pub use order_service::{
    price_order, CreateOrderRequest, CreateOrderResponse, OrderPolicy, OrderService,
    DEFAULT_MAX_TICKETS_PER_ORDER,
};
