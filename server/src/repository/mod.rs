//! Storage seams for the allocation protocol.
//!
//! Everything the protocol reads or writes goes through a [`UnitOfWork`]: one
//! database transaction that is either committed as a whole or rolled back.
//! Row locking is a capability of the unit of work
//! ([`UnitOfWork::lock_available_tickets`]) so the protocol never depends on a
//! particular engine's locking syntax.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ConcertSession, NewOrder, Order, Ticket};

pub mod postgres;

pub use postgres::{
    OrderRepository, PgUnitOfWork, PgUnitOfWorkProvider, SessionRepository, TicketRepository,
};

/// SQLSTATE raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// SQLSTATE raised by the deadlock detector.
const DEADLOCK_DETECTED: &str = "40P01";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("timed out waiting for a row lock")]
    LockTimeout,

    #[error("deadlock detected")]
    Deadlock,

    #[error("inconsistent store state: {0}")]
    Inconsistent(String),
}

impl StoreError {
    /// Lock contention failures: the transaction was aborted by the engine and
    /// a fresh attempt may succeed.
    pub fn is_contention(&self) -> bool {
        matches!(self, StoreError::LockTimeout | StoreError::Deadlock)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let code = match &err {
            sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
            _ => None,
        };
        match code.as_deref() {
            Some(LOCK_NOT_AVAILABLE) => StoreError::LockTimeout,
            Some(DEADLOCK_DETECTED) => StoreError::Deadlock,
            _ => StoreError::Database(err),
        }
    }
}

/// One atomic, all-or-nothing sequence of storage operations.
///
/// Dropping a unit of work without calling [`commit`](UnitOfWork::commit)
/// discards every write made through it.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn find_session(&mut self, session_id: i64)
        -> Result<Option<ConcertSession>, StoreError>;

    /// Returns up to `quantity` available tickets of the session in ascending
    /// id order, each held under an exclusive row lock until the unit of work
    /// ends. A competing unit of work asking for the same rows waits.
    async fn lock_available_tickets(
        &mut self,
        session_id: i64,
        quantity: u32,
    ) -> Result<Vec<Ticket>, StoreError>;

    /// Moves every listed ticket from `available` to `pending`. Fails with
    /// [`StoreError::Inconsistent`] unless all of them made the transition.
    async fn mark_pending(&mut self, ticket_ids: &[Uuid]) -> Result<(), StoreError>;

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UnitOfWorkProvider: Send + Sync + 'static {
    type Unit: UnitOfWork + 'static;

    async fn begin(&self) -> Result<Self::Unit, StoreError>;
}
