use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error::OrderError;
use crate::models::{NewOrder, Order, OrderStatus};
use crate::repository::{UnitOfWork, UnitOfWorkProvider};

pub const DEFAULT_MAX_TICKETS_PER_ORDER: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderPolicy {
    pub max_tickets_per_order: u32,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self {
            max_tickets_per_order: DEFAULT_MAX_TICKETS_PER_ORDER,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    pub concert_session_id: i64,
    pub number_of_tickets: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub order_id: i64,
    pub status: OrderStatus,
    pub ticket_ids: Vec<Uuid>,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Exact order total. Overflow is an internal failure, never a rounded value.
pub fn price_order(unit_price: Decimal, quantity: u32) -> Result<Decimal, OrderError> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| OrderError::Internal("order total overflows".to_string()))
}

/// Runs the allocation protocol: validate, then reserve and record an order
/// inside a single unit of work.
///
/// The service keeps no state between calls. All coordination between
/// concurrent orders happens in the store's row locks.
pub struct OrderService<P> {
    store: P,
    policy: OrderPolicy,
}

impl<P: UnitOfWorkProvider> OrderService<P> {
    pub fn new(store: P, policy: OrderPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> OrderPolicy {
        self.policy
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    /// Checks the request shape and returns the ticket quantity.
    pub fn validate(&self, request: &CreateOrderRequest) -> Result<u32, OrderError> {
        if request.user_id <= 0 {
            return Err(OrderError::InvalidArgument(
                "user_id must be positive".to_string(),
            ));
        }
        if request.concert_session_id <= 0 {
            return Err(OrderError::InvalidArgument(
                "concert_session_id must be positive".to_string(),
            ));
        }
        if request.number_of_tickets <= 0 {
            return Err(OrderError::InvalidArgument(
                "number_of_tickets must be positive".to_string(),
            ));
        }
        let max = self.policy.max_tickets_per_order;
        match u32::try_from(request.number_of_tickets) {
            Ok(quantity) if quantity <= max => Ok(quantity),
            _ => Err(OrderError::InvalidArgument(format!(
                "maximum {max} tickets allowed per order"
            ))),
        }
    }

    #[tracing::instrument(
        name = "create_order",
        skip_all,
        fields(
            user_id = request.user_id,
            session_id = request.concert_session_id,
            quantity = request.number_of_tickets,
        )
    )]
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<CreateOrderResponse, OrderError> {
        debug!("Creating order");

        let quantity = self.validate(request).map_err(|err| {
            warn!(error = %err, "Rejected order request");
            err
        })?;

        let mut unit = self.store.begin().await?;

        match allocate(&mut unit, request.concert_session_id, quantity).await {
            Ok((order, ticket_ids)) => {
                unit.commit().await?;
                info!(
                    order_id = order.id,
                    tickets = ticket_ids.len(),
                    total_price = %order.total_price,
                    "Order created"
                );
                Ok(CreateOrderResponse {
                    order_id: order.id,
                    status: order.status,
                    ticket_ids,
                    total_price: order.total_price,
                    created_at: order.created_at,
                })
            }
            Err(err) => {
                if let Err(rollback_err) = unit.rollback().await {
                    error!(error = %rollback_err, "Failed to roll back order allocation");
                }
                match &err {
                    OrderError::NotFound(_) | OrderError::ResourceExhausted(_) => {
                        info!(error = %err, "Order not created")
                    }
                    OrderError::Contention(_) => {
                        warn!(error = %err, "Order allocation aborted by lock contention")
                    }
                    _ => error!(error = %err, "Order allocation failed"),
                }
                Err(err)
            }
        }
    }
}

async fn allocate<U: UnitOfWork>(
    unit: &mut U,
    session_id: i64,
    quantity: u32,
) -> Result<(Order, Vec<Uuid>), OrderError> {
    let session = unit
        .find_session(session_id)
        .await?
        .ok_or_else(|| OrderError::NotFound("session not found".to_string()))?;

    let tickets = unit.lock_available_tickets(session.id, quantity).await?;
    let wanted = quantity as usize;
    if tickets.len() < wanted {
        return Err(OrderError::ResourceExhausted(
            "no tickets available".to_string(),
        ));
    }
    if tickets.len() > wanted {
        return Err(OrderError::Internal(format!(
            "store locked {} tickets for a request of {wanted}",
            tickets.len()
        )));
    }

    let total_price = price_order(session.price, quantity)?;
    let order = unit.insert_order(&NewOrder::pending(total_price)).await?;

    let ticket_ids: Vec<Uuid> = tickets.iter().map(|t| t.id).collect();
    unit.mark_pending(&ticket_ids).await?;

    Ok((order, ticket_ids))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{ConcertSession, Ticket};
    use crate::repository::StoreError;
    use crate::service::ErrorKind;

    /// Counts `begin` calls and refuses to open a unit of work.
    #[derive(Default)]
    struct UntouchedStore {
        begins: AtomicUsize,
    }

    struct NeverUnit;

    #[async_trait]
    impl UnitOfWork for NeverUnit {
        async fn find_session(&mut self, _: i64) -> Result<Option<ConcertSession>, StoreError> {
            unreachable!()
        }
        async fn lock_available_tickets(
            &mut self,
            _: i64,
            _: u32,
        ) -> Result<Vec<Ticket>, StoreError> {
            unreachable!()
        }
        async fn mark_pending(&mut self, _: &[Uuid]) -> Result<(), StoreError> {
            unreachable!()
        }
        async fn insert_order(&mut self, _: &NewOrder) -> Result<Order, StoreError> {
            unreachable!()
        }
        async fn commit(self) -> Result<(), StoreError> {
            unreachable!()
        }
        async fn rollback(self) -> Result<(), StoreError> {
            unreachable!()
        }
    }

    #[async_trait]
    impl UnitOfWorkProvider for UntouchedStore {
        type Unit = NeverUnit;

        async fn begin(&self) -> Result<NeverUnit, StoreError> {
            self.begins.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Inconsistent("store should not be touched".into()))
        }
    }

    fn request(user_id: i64, session_id: i64, tickets: i64) -> CreateOrderRequest {
        CreateOrderRequest {
            user_id,
            concert_session_id: session_id,
            number_of_tickets: tickets,
        }
    }

    #[test]
    fn test_price_is_exact() {
        assert_eq!(price_order(dec!(10.00), 3).unwrap(), dec!(30.00));
        assert_eq!(price_order(dec!(0.10), 3).unwrap(), dec!(0.30));
        assert_eq!(price_order(dec!(99.99), 3).unwrap(), dec!(299.97));
        assert_eq!(price_order(Decimal::ZERO, 2).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_price_overflow_is_internal() {
        let err = price_order(Decimal::MAX, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_validate_accepts_policy_range() {
        let service = OrderService::new(UntouchedStore::default(), OrderPolicy::default());
        for n in 1..=3 {
            assert_eq!(service.validate(&request(1, 1, n)).unwrap(), n as u32);
        }
    }

    #[tokio::test]
    async fn test_invalid_requests_never_reach_the_store() {
        let service = OrderService::new(UntouchedStore::default(), OrderPolicy::default());

        let cases = [
            request(0, 1, 1),
            request(-1, 1, 1),
            request(1, 0, 1),
            request(1, -1, 1),
            request(1, 1, 0),
            request(1, 1, -2),
            request(1, 1, 4),
            request(1, 1, i64::MAX),
        ];

        for case in &cases {
            let err = service.create_order(case).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{case:?}");
        }
        assert_eq!(service.store().begins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_policy_limit_is_configurable() {
        let policy = OrderPolicy {
            max_tickets_per_order: 5,
        };
        let service = OrderService::new(UntouchedStore::default(), policy);

        assert_eq!(service.validate(&request(1, 1, 5)).unwrap(), 5);
        let err = service.validate(&request(1, 1, 6)).unwrap_err();
        assert_eq!(err.to_string(), "maximum 5 tickets allowed per order");
    }

    #[tokio::test]
    async fn test_begin_failure_is_internal() {
        let service = OrderService::new(UntouchedStore::default(), OrderPolicy::default());
        let err = service.create_order(&request(1, 1, 1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(service.store().begins.load(Ordering::SeqCst), 1);
    }
}
