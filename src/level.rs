//! One price level: a priority queue of resting entries.
//!
//! Entries are ordered by their externally assigned priority key (lower =
//! earlier), with venue time as the tie-break so that fragments of one order
//! (which share its priority) queue in arrival order. Keying the queue by
//! that position makes the mid-queue removal needed for cancellation
//! logarithmic instead of a linear scan and re-heapify. Aggregate volume is
//! maintained on every mutation.

use crate::error::EngineError;
use crate::types::{EntryKey, OrderId, Side};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// The unit that occupies a price level: quantity of an order still resting,
/// unmatched. Refers to its [`crate::order::PrimaryOrder`] by id only.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RestingEntry {
    pub key: EntryKey,
    pub order_id: OrderId,
    pub side: Side,
    pub price: Decimal,
    /// Quantity not yet matched; non-increasing.
    pub quantity: u64,
    pub priority: u64,
}

/// Queue position: priority key first, venue time as the tie-break.
type QueuePosition = (u64, u64);

fn position_of(entry: &RestingEntry) -> QueuePosition {
    (entry.priority, entry.key.venue_time)
}

/// Priority queue of [`RestingEntry`] at one price. Ephemeral: the book
/// creates it with the first entry at a price and drops it with the last.
#[derive(Clone, Debug, Default)]
pub struct PriceLevelQueue {
    entries: BTreeMap<QueuePosition, RestingEntry>,
    volume: u64,
}

impl PriceLevelQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of resting quantities at this level.
    pub fn volume(&self) -> u64 {
        self.volume
    }

    /// Inserts an entry keyed by its queue position. Entry keys are unique
    /// across the feed, so a position collision is an invariant breach.
    pub fn push(&mut self, entry: RestingEntry) -> Result<(), EngineError> {
        if self.entries.contains_key(&position_of(&entry)) {
            return Err(EngineError::DuplicatePriority {
                price: entry.price,
                priority: entry.priority,
            });
        }
        self.volume += entry.quantity;
        self.entries.insert(position_of(&entry), entry);
        Ok(())
    }

    /// Entry with the lowest priority key, without removing it.
    pub fn peek_head(&self) -> Result<&RestingEntry, EngineError> {
        self.entries.values().next().ok_or(EngineError::EmptyLevel)
    }

    /// Removes and returns the lowest-priority-key entry.
    pub fn pop_head(&mut self) -> Result<RestingEntry, EngineError> {
        let (_, entry) = self.entries.pop_first().ok_or(EngineError::EmptyLevel)?;
        self.volume -= entry.quantity;
        Ok(entry)
    }

    /// Removes the entry resting under `key` at the given priority
    /// (cancellation of a resting order that is not at the head).
    pub fn remove_at(&mut self, key: EntryKey, priority: u64) -> Option<RestingEntry> {
        let entry = self.entries.remove(&(priority, key.venue_time))?;
        self.volume -= entry.quantity;
        Some(entry)
    }

    /// Decrements the head entry's quantity in place (partial match; the
    /// entry keeps its queue position).
    pub fn reduce_head(&mut self, quantity: u64) -> Result<(), EngineError> {
        let head = self
            .entries
            .values_mut()
            .next()
            .ok_or(EngineError::EmptyLevel)?;
        if quantity > head.quantity {
            return Err(EngineError::ExcessReduction {
                requested: quantity,
                available: head.quantity,
            });
        }
        head.quantity -= quantity;
        self.volume -= quantity;
        Ok(())
    }

    /// Entries in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &RestingEntry> {
        self.entries.values()
    }
}
