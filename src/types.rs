//! Core types and identifiers for the replay engine.
//!
//! Identifiers are newtype wrappers. [`NewOrder`], [`Execution`], and
//! [`Deletion`] are the three validated event kinds handed to the engine by
//! the feed boundary, strictly in arrival order.

use rust_decimal::Decimal;
use std::fmt;

/// Unique order identifier, stable across the order's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Composite key identifying one resting entry: the originating order id plus
/// the venue time of the execution event that created it. The feed guarantees
/// this pair is unique across all entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct EntryKey {
    pub order_id: OrderId,
    pub venue_time: u64,
}

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// New-order event (`A`): announces an order's existence and limit.
/// Registers a [`crate::order::PrimaryOrder`]; never touches the book itself.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NewOrder {
    pub network_time: u64,
    pub venue_time: u64,
    pub instrument: String,
    pub side: Side,
    pub price: Decimal,
    /// Externally assigned queue position; lower means earlier priority.
    pub priority: u64,
    pub quantity: u64,
    pub order_id: OrderId,
}

/// Execution event (`E`): delivers quantity of an admitted order to the
/// market. Matched against the opposite book; any remainder rests.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Execution {
    pub network_time: u64,
    pub venue_time: u64,
    pub order_id: OrderId,
    pub quantity: u64,
}

/// Deletion event (`D`): cancels an admitted order and purges any of its
/// quantity still resting on the book.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Deletion {
    pub network_time: u64,
    pub venue_time: u64,
    pub order_id: OrderId,
}

/// One validated feed event.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Event {
    New(NewOrder),
    Execute(Execution),
    Delete(Deletion),
}

impl Event {
    pub fn venue_time(&self) -> u64 {
        match self {
            Event::New(e) => e.venue_time,
            Event::Execute(e) => e.venue_time,
            Event::Delete(e) => e.venue_time,
        }
    }

    pub fn order_id(&self) -> OrderId {
        match self {
            Event::New(e) => e.order_id,
            Event::Execute(e) => e.order_id,
            Event::Delete(e) => e.order_id,
        }
    }
}
