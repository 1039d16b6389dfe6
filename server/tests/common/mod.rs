//! In-memory store implementing the unit-of-work traits.
//!
//! A unit of work holds the whole inventory lock from `begin` until it ends,
//! so concurrent allocations serialize the way overlapping row locks do in
//! Postgres. Writes are staged and only applied on `commit`.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use tickets_server::models::{ConcertSession, NewOrder, Order, Ticket, TicketStatus};
use tickets_server::repository::{StoreError, UnitOfWork, UnitOfWorkProvider};
use tickets_server::service::{OrderPolicy, OrderService};

#[derive(Default)]
struct Inventory {
    sessions: HashMap<i64, ConcertSession>,
    tickets: BTreeMap<Uuid, Ticket>,
    orders: Vec<Order>,
    next_order_id: i64,
}

/// Which store call should fail in the next units of work.
#[derive(Default)]
pub struct Faults {
    pub fail_insert_order: AtomicBool,
    pub fail_mark_pending: AtomicBool,
    pub fail_commit: AtomicBool,
    pub deadlock_on_lock: AtomicBool,
}

#[derive(Default)]
pub struct Counters {
    pub begins: AtomicUsize,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inventory: Arc<Mutex<Inventory>>,
    pub faults: Arc<Faults>,
    pub counters: Arc<Counters>,
}

impl MemoryStore {
    pub async fn add_session(&self, id: i64, price: Decimal, tickets: usize) -> Vec<Uuid> {
        let mut inv = self.inventory.lock().await;
        let start = Utc::now() + Duration::days(30);
        inv.sessions.insert(
            id,
            ConcertSession {
                id,
                concert_id: 1,
                start_time: start,
                end_time: start + Duration::hours(3),
                venue: "Main Arena".to_string(),
                number_of_seats: tickets as i32,
                price,
            },
        );
        let mut ids: Vec<Uuid> = (0..tickets).map(|_| Uuid::new_v4()).collect();
        for ticket_id in &ids {
            inv.tickets.insert(
                *ticket_id,
                Ticket {
                    id: *ticket_id,
                    session_id: id,
                    status: TicketStatus::Available,
                },
            );
        }
        ids.sort();
        ids
    }

    pub async fn available(&self, session_id: i64) -> usize {
        let inv = self.inventory.lock().await;
        inv.tickets
            .values()
            .filter(|t| t.session_id == session_id && t.is_available())
            .count()
    }

    pub async fn ticket_status(&self, id: Uuid) -> Option<TicketStatus> {
        self.inventory.lock().await.tickets.get(&id).map(|t| t.status)
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.inventory.lock().await.orders.clone()
    }

    pub fn service(&self) -> OrderService<MemoryStore> {
        OrderService::new(self.clone(), OrderPolicy::default())
    }
}

pub struct MemoryUnit {
    inventory: OwnedMutexGuard<Inventory>,
    faults: Arc<Faults>,
    counters: Arc<Counters>,
    staged_orders: Vec<Order>,
    staged_pending: Vec<Uuid>,
}

#[async_trait]
impl UnitOfWorkProvider for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> Result<MemoryUnit, StoreError> {
        self.counters.begins.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryUnit {
            inventory: Arc::clone(&self.inventory).lock_owned().await,
            faults: Arc::clone(&self.faults),
            counters: Arc::clone(&self.counters),
            staged_orders: Vec::new(),
            staged_pending: Vec::new(),
        })
    }
}

fn injected(flag: &AtomicBool) -> bool {
    flag.load(Ordering::SeqCst)
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn find_session(
        &mut self,
        session_id: i64,
    ) -> Result<Option<ConcertSession>, StoreError> {
        Ok(self.inventory.sessions.get(&session_id).cloned())
    }

    async fn lock_available_tickets(
        &mut self,
        session_id: i64,
        quantity: u32,
    ) -> Result<Vec<Ticket>, StoreError> {
        if injected(&self.faults.deadlock_on_lock) {
            return Err(StoreError::Deadlock);
        }
        // Let competing tasks pile up on the inventory lock.
        tokio::task::yield_now().await;
        Ok(self
            .inventory
            .tickets
            .values()
            .filter(|t| t.session_id == session_id && t.is_available())
            .take(quantity as usize)
            .cloned()
            .collect())
    }

    async fn mark_pending(&mut self, ticket_ids: &[Uuid]) -> Result<(), StoreError> {
        if injected(&self.faults.fail_mark_pending) {
            return Err(StoreError::Inconsistent("injected mark_pending failure".into()));
        }
        for id in ticket_ids {
            match self.inventory.tickets.get(id) {
                Some(t) if t.is_available() => self.staged_pending.push(*id),
                _ => {
                    return Err(StoreError::Inconsistent(format!(
                        "ticket {id} is not available"
                    )))
                }
            }
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError> {
        if injected(&self.faults.fail_insert_order) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.inventory.next_order_id += 1;
        let order = Order {
            id: self.inventory.next_order_id,
            created_at: Utc::now(),
            status: order.status,
            total_price: order.total_price,
        };
        self.staged_orders.push(order.clone());
        Ok(order)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if injected(&self.faults.fail_commit) {
            self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        for id in std::mem::take(&mut self.staged_pending) {
            if let Some(ticket) = self.inventory.tickets.get_mut(&id) {
                ticket.status = TicketStatus::Pending;
            }
        }
        let orders = std::mem::take(&mut self.staged_orders);
        self.inventory.orders.extend(orders);
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
