//! Error taxonomy: event-local rejections vs fatal invariant breaches.
//!
//! Non-fatal errors reject a single event and leave engine state unchanged;
//! the replay loop logs them and continues. Fatal errors mean an upstream
//! contract was broken (overfill, missing entry) and the run must halt after
//! dumping book state. [`EngineError::is_fatal`] is what the loop consults.

use crate::types::{EntryKey, OrderId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors produced by the matching core.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    /// New-order event for an identifier that is already open.
    #[error("duplicate order id {0}")]
    DuplicateOrder(OrderId),

    /// Execution or deletion referencing an order that was never admitted
    /// (or is already closed).
    #[error("unknown order id {0}")]
    UnknownOrder(OrderId),

    /// Malformed field values that slipped past boundary validation.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Execution quantity exceeds the order's remaining unexecuted quantity.
    #[error("execution of {requested} exceeds remaining {remaining} on order {order_id}")]
    Overfill {
        order_id: OrderId,
        requested: u64,
        remaining: u64,
    },

    /// A removal was requested for an entry the book does not hold.
    #[error("no resting entry for order {} at venue time {}", .0.order_id, .0.venue_time)]
    EntryMissing(EntryKey),

    /// An execution tried to rest an entry under a key the book already
    /// holds; the feed guarantees (order id, venue time) pairs are unique.
    #[error("entry for order {} at venue time {} already resting", .0.order_id, .0.venue_time)]
    DuplicateEntry(EntryKey),

    /// Two entries with the same priority key at one price level; the feed
    /// guarantees this never happens.
    #[error("duplicate priority {priority} at price {price}")]
    DuplicatePriority { price: Decimal, priority: u64 },

    /// Head access on an empty price level queue.
    #[error("price level queue is empty")]
    EmptyLevel,

    /// In-place reduction larger than the entry being reduced.
    #[error("reduction of {requested} exceeds resting quantity {available}")]
    ExcessReduction { requested: u64, available: u64 },
}

impl EngineError {
    /// True for invariant breaches that must abort the run. Everything else
    /// rejects only the offending event.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::Overfill { .. }
                | EngineError::EntryMissing(_)
                | EngineError::DuplicateEntry(_)
                | EngineError::DuplicatePriority { .. }
                | EngineError::EmptyLevel
                | EngineError::ExcessReduction { .. }
        )
    }
}

/// Boundary rejection: a raw feed line that never becomes an [`crate::types::Event`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("expected 9 fields, got {0}")]
    FieldCount(usize),

    #[error("message type must be A, E or D, got {0:?}")]
    BadMsgType(String),

    #[error("side must be B or S, got {0:?}")]
    BadSide(String),

    #[error("{field} must be a positive integer, got {value:?}")]
    BadInteger {
        field: &'static str,
        value: String,
    },

    #[error("invalid price {0:?}")]
    BadPrice(String),
}
