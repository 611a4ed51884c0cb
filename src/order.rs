//! Order lifecycle: the authoritative record for an admitted order.
//!
//! A [`PrimaryOrder`] is created by a new-order event and mutated by every
//! execution event referencing its id. Remaining quantity is decremented
//! once, up front, by the full execution-event quantity; the resting entry's
//! own quantity is what shrinks incrementally as it crosses the opposite
//! book. Side and price are immutable after creation.

use crate::error::EngineError;
use crate::types::{Deletion, EntryKey, Execution, NewOrder, OrderId, Side};
use rust_decimal::Decimal;

/// Lifecycle state. `Filled` and `Canceled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderState {
    Open,
    PartiallyFilled,
    Filled,
    Canceled,
}

/// One applied secondary event, kept in arrival order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderEvent {
    Executed { venue_time: u64, quantity: u64 },
    Deleted { venue_time: u64 },
}

/// The admitted order record tracking total lifecycle and remaining quantity.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PrimaryOrder {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Decimal,
    /// Original quantity from the new-order event.
    pub quantity: u64,
    /// Remaining unexecuted quantity; non-increasing, never negative.
    pub remaining: u64,
    pub priority: u64,
    pub state: OrderState,
    /// Applied execution/deletion events, in arrival order.
    pub history: Vec<OrderEvent>,
    /// Keys of this order's entries currently resting on a book. The matching
    /// discipline yields at most one live entry at a time, but deletion must
    /// purge every fragment, so all are tracked.
    pub resting: Vec<EntryKey>,
}

impl PrimaryOrder {
    pub fn new(msg: &NewOrder) -> Self {
        Self {
            order_id: msg.order_id,
            side: msg.side,
            price: msg.price,
            quantity: msg.quantity,
            remaining: msg.quantity,
            priority: msg.priority,
            state: OrderState::Open,
            history: Vec::new(),
            resting: Vec::new(),
        }
    }

    /// Applies an execution event: decrements remaining quantity by the full
    /// event quantity and records it. Fails with [`EngineError::Overfill`] if
    /// the quantity exceeds what remains, without mutating the order.
    pub fn apply_execution(&mut self, exec: &Execution) -> Result<(), EngineError> {
        if self.state == OrderState::Canceled {
            return Err(EngineError::InvalidEvent(format!(
                "execution on canceled order {}",
                self.order_id
            )));
        }
        if exec.quantity > self.remaining {
            return Err(EngineError::Overfill {
                order_id: self.order_id,
                requested: exec.quantity,
                remaining: self.remaining,
            });
        }
        self.remaining -= exec.quantity;
        self.state = if self.remaining == 0 {
            OrderState::Filled
        } else {
            OrderState::PartiallyFilled
        };
        self.history.push(OrderEvent::Executed {
            venue_time: exec.venue_time,
            quantity: exec.quantity,
        });
        Ok(())
    }

    /// Applies a deletion event: terminal transition to `Canceled`. The engine
    /// is responsible for purging resting entries from the books.
    pub fn apply_deletion(&mut self, del: &Deletion) {
        self.state = OrderState::Canceled;
        self.history.push(OrderEvent::Deleted {
            venue_time: del.venue_time,
        });
    }

    pub fn is_filled(&self) -> bool {
        self.remaining == 0
    }

    pub fn has_resting(&self) -> bool {
        !self.resting.is_empty()
    }

    pub fn track_entry(&mut self, key: EntryKey) {
        self.resting.push(key);
    }

    pub fn clear_entry(&mut self, key: EntryKey) {
        self.resting.retain(|k| *k != key);
    }
}
