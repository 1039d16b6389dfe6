use thiserror::Error;

pub mod concert;
pub mod order;
pub mod ticket;

pub use concert::{Concert, ConcertSession};
pub use order::{NewOrder, Order, OrderStatus};
pub use ticket::{Ticket, TicketStatus};

/// A record that breaks one of its own field constraints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}
