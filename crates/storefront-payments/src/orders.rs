//! Order Transitions
//!
//! Verified webhook events end up here as status transitions keyed by the
//! provider's transaction id. Order persistence proper belongs to the
//! management side; `OrderStore` is the seam it plugs into.
//!
//! `MemoryOrderStore` lives in one process and remembers only the most
//! recent [`MAX_TRACKED_EVENTS`] event ids. A redelivery older than that is
//! no longer a `Duplicate`, but the status guard still turns it into `Stale`
//! or a no-op repeat of a non-terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;

use crate::error::{PaymentError, Result};
use crate::rail::{PaymentStatus, Rail};

/// A requested status change for the order behind a provider transaction
#[derive(Clone, Debug)]
pub struct OrderTransition {
    pub rail: Rail,

    /// PaymentIntent id (card) or payment id (regional)
    pub transaction_id: String,

    pub status: PaymentStatus,

    /// Provider event id, used to drop redeliveries
    pub event_id: String,

    /// Reconciliation data carried by the event, if any
    pub metadata: HashMap<String, String>,
}

/// Latest known state of an order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderRecord {
    pub rail: Rail,
    pub transaction_id: String,
    pub status: PaymentStatus,

    /// Every status applied, oldest first
    pub history: Vec<PaymentStatus>,

    pub metadata: HashMap<String, String>,
    pub updated_at: DateTime<Utc>,
}

/// What happened to a transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Status recorded
    Applied(PaymentStatus),

    /// Event id already processed
    Duplicate,

    /// Order already in a state it cannot leave this way
    Stale {
        current: PaymentStatus,
        requested: PaymentStatus,
    },
}

/// Order storage trait
pub trait OrderStore: Send + Sync {
    /// Apply a transition (atomic dedupe + check + write)
    fn apply(&self, transition: &OrderTransition) -> Result<TransitionOutcome>;

    /// Get an order by rail and transaction id
    fn get(&self, rail: Rail, transaction_id: &str) -> Result<Option<OrderRecord>>;
}

/// Event ids remembered for redelivery detection
pub const MAX_TRACKED_EVENTS: usize = 10_000;

#[derive(Default)]
struct Orders {
    records: HashMap<(Rail, String), OrderRecord>,
    seen_events: HashSet<(Rail, String)>,

    /// Insertion order of `seen_events`, oldest first
    event_order: VecDeque<(Rail, String)>,
}

impl Orders {
    fn remember(&mut self, event_key: (Rail, String), capacity: usize) {
        self.seen_events.insert(event_key.clone());
        self.event_order.push_back(event_key);

        while self.event_order.len() > capacity {
            if let Some(oldest) = self.event_order.pop_front() {
                self.seen_events.remove(&oldest);
            }
        }
    }
}

/// In-memory order store (for development)
pub struct MemoryOrderStore {
    inner: RwLock<Orders>,
    event_capacity: usize,
}

impl Default for MemoryOrderStore {
    fn default() -> Self {
        Self {
            inner: RwLock::default(),
            event_capacity: MAX_TRACKED_EVENTS,
        }
    }
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember at most `capacity` event ids (at least one)
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

fn poisoned<T>(_: T) -> PaymentError {
    PaymentError::Storage("order store lock poisoned".into())
}

impl OrderStore for MemoryOrderStore {
    fn apply(&self, transition: &OrderTransition) -> Result<TransitionOutcome> {
        let mut orders = self.inner.write().map_err(poisoned)?;

        let event_key = (transition.rail, transition.event_id.clone());
        if orders.seen_events.contains(&event_key) {
            return Ok(TransitionOutcome::Duplicate);
        }

        let key = (transition.rail, transition.transaction_id.clone());
        let outcome = match orders.records.get_mut(&key) {
            Some(record) if !record.status.can_transition_to(transition.status) => {
                TransitionOutcome::Stale {
                    current: record.status,
                    requested: transition.status,
                }
            }
            Some(record) => {
                record.status = transition.status;
                record.history.push(transition.status);
                record.metadata.extend(transition.metadata.clone());
                record.updated_at = Utc::now();
                TransitionOutcome::Applied(transition.status)
            }
            None => {
                orders.records.insert(
                    key,
                    OrderRecord {
                        rail: transition.rail,
                        transaction_id: transition.transaction_id.clone(),
                        status: transition.status,
                        history: vec![transition.status],
                        metadata: transition.metadata.clone(),
                        updated_at: Utc::now(),
                    },
                );
                TransitionOutcome::Applied(transition.status)
            }
        };

        orders.remember(event_key, self.event_capacity);
        Ok(outcome)
    }

    fn get(&self, rail: Rail, transaction_id: &str) -> Result<Option<OrderRecord>> {
        let orders = self.inner.read().map_err(poisoned)?;
        Ok(orders
            .records
            .get(&(rail, transaction_id.to_string()))
            .cloned())
    }
}
