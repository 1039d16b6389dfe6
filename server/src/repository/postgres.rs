use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgExecutor, PgPool};
use sqlx::{Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{StoreError, UnitOfWork, UnitOfWorkProvider};
use crate::models::{ConcertSession, NewOrder, Order, Ticket};

pub struct SessionRepository;

impl SessionRepository {
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
    ) -> Result<Option<ConcertSession>, sqlx::Error> {
        sqlx::query_as::<_, ConcertSession>(
            r#"
            SELECT id, concert_id, start_time, end_time, venue, number_of_seats, price
            FROM concert_sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }
}

pub struct TicketRepository;

impl TicketRepository {
    /// `FOR UPDATE` without `SKIP LOCKED`: a second allocator touching the
    /// same rows blocks, then re-checks `status` once the holder finishes.
    pub async fn lock_available<'e>(
        executor: impl PgExecutor<'e>,
        session_id: i64,
        limit: i64,
    ) -> Result<Vec<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(
            r#"
            SELECT id, session_id, status
            FROM tickets
            WHERE session_id = $1 AND status = 'available'
            ORDER BY id ASC
            LIMIT $2
            FOR UPDATE
            "#,
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(executor)
        .await
    }

    /// Returns the number of rows that actually moved to `pending`.
    pub async fn mark_pending<'e>(
        executor: impl PgExecutor<'e>,
        ticket_ids: &[Uuid],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET status = 'pending'
            WHERE id = ANY($1) AND status = 'available'
            "#,
        )
        .bind(ticket_ids)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn count_available<'e>(
        executor: impl PgExecutor<'e>,
        session_id: i64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tickets WHERE session_id = $1 AND status = 'available'",
        )
        .bind(session_id)
        .fetch_one(executor)
        .await
    }
}

pub struct OrderRepository;

impl OrderRepository {
    pub async fn insert<'e>(
        executor: impl PgExecutor<'e>,
        order: &NewOrder,
    ) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (status, total_price)
            VALUES ($1, $2)
            RETURNING id, created_at, status, total_price
            "#,
        )
        .bind(order.status)
        .bind(order.total_price)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
    ) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            "SELECT id, created_at, status, total_price FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn count<'e>(executor: impl PgExecutor<'e>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
            .fetch_one(executor)
            .await
    }
}

/// Opens Postgres transactions with a bounded `lock_timeout`.
#[derive(Clone)]
pub struct PgUnitOfWorkProvider {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgUnitOfWorkProvider {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UnitOfWorkProvider for PgUnitOfWorkProvider {
    type Unit = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork, StoreError> {
        let mut tx = self.pool.begin().await?;

        // is_local = true scopes the setting to this transaction.
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        Ok(PgUnitOfWork { tx })
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_session(
        &mut self,
        session_id: i64,
    ) -> Result<Option<ConcertSession>, StoreError> {
        Ok(SessionRepository::find_by_id(&mut *self.tx, session_id).await?)
    }

    async fn lock_available_tickets(
        &mut self,
        session_id: i64,
        quantity: u32,
    ) -> Result<Vec<Ticket>, StoreError> {
        let tickets =
            TicketRepository::lock_available(&mut *self.tx, session_id, i64::from(quantity))
                .await?;
        debug!(session_id, requested = quantity, locked = tickets.len(), "Locked tickets");
        Ok(tickets)
    }

    async fn mark_pending(&mut self, ticket_ids: &[Uuid]) -> Result<(), StoreError> {
        let updated = TicketRepository::mark_pending(&mut *self.tx, ticket_ids).await?;
        if updated != ticket_ids.len() as u64 {
            return Err(StoreError::Inconsistent(format!(
                "expected {} tickets to move to pending, {} did",
                ticket_ids.len(),
                updated
            )));
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError> {
        Ok(OrderRepository::insert(&mut *self.tx, order).await?)
    }

    async fn commit(self) -> Result<(), StoreError> {
        Ok(self.tx.commit().await?)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(self.tx.rollback().await?)
    }
}
