//! Output records and the collaborator boundary.
//!
//! The core calls out to a [`TradeSink`] and a [`SnapshotSink`]; it never
//! opens files or manages persistence itself. The shared in-memory sinks are
//! what the replay driver and the tests use: clones share one backing buffer,
//! so the driver can read everything back after the stream is frozen.

use crate::types::OrderId;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

pub const TRADES_CSV_HEADER: &str = "venue_time,price,qty,buy_id,sell_id";
pub const MARKET_CSV_HEADER: &str = "venue_time,ask,bid,volume";

/// One match between a resting and an incoming order, priced at the resting
/// order's level.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Trade {
    pub venue_time: u64,
    pub price: Decimal,
    pub quantity: u64,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
}

impl Trade {
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.venue_time, self.price, self.quantity, self.buy_order_id, self.sell_order_id
        )
    }
}

/// Top-of-book state after an execution event that produced trades.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MarketSnapshot {
    pub venue_time: u64,
    pub best_ask: Option<Decimal>,
    pub best_bid: Option<Decimal>,
    /// Combined bid + ask resting volume.
    pub volume: u64,
}

impl MarketSnapshot {
    pub fn to_csv_row(&self) -> String {
        let fmt = |p: Option<Decimal>| p.map(|d| d.to_string()).unwrap_or_default();
        format!(
            "{},{},{},{}",
            self.venue_time,
            fmt(self.best_ask),
            fmt(self.best_bid),
            self.volume
        )
    }
}

/// One price level in a depth snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DepthLevel {
    pub price: Decimal,
    pub volume: u64,
}

/// Best-n price levels per side: asks ascending, bids descending.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DepthSnapshot {
    pub venue_time: u64,
    pub asks: Vec<DepthLevel>,
    pub bids: Vec<DepthLevel>,
}

/// Accepts one trade record at a time. Implementations decide what storage or
/// buffering to apply; the engine only hands records over.
pub trait TradeSink: Send + Sync {
    fn accept(&self, trade: &Trade);
}

/// Accepts one market snapshot at a time.
pub trait SnapshotSink: Send + Sync {
    fn accept(&self, snapshot: &MarketSnapshot);
}

/// In-memory trade sink. Clone shares the same backing buffer.
#[derive(Clone, Default)]
pub struct MemoryTradeSink {
    trades: Arc<Mutex<Vec<Trade>>>,
}

impl MemoryTradeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.trades.lock().expect("lock").clone()
    }

    pub fn len(&self) -> usize {
        self.trades.lock().expect("lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TradeSink for MemoryTradeSink {
    fn accept(&self, trade: &Trade) {
        self.trades.lock().expect("lock").push(trade.clone());
    }
}

/// In-memory snapshot sink. Clone shares the same backing buffer.
#[derive(Clone, Default)]
pub struct MemorySnapshotSink {
    snapshots: Arc<Mutex<Vec<MarketSnapshot>>>,
}

impl MemorySnapshotSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<MarketSnapshot> {
        self.snapshots.lock().expect("lock").clone()
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().expect("lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotSink for MemorySnapshotSink {
    fn accept(&self, snapshot: &MarketSnapshot) {
        self.snapshots.lock().expect("lock").push(snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sinks_share_buffer_across_clones() {
        let sink = MemoryTradeSink::new();
        let shared = sink.clone();
        sink.accept(&Trade {
            venue_time: 10,
            price: Decimal::from(100),
            quantity: 4,
            buy_order_id: OrderId(1),
            sell_order_id: OrderId(2),
        });
        assert_eq!(shared.len(), 1);
        assert_eq!(shared.trades()[0].quantity, 4);
    }

    #[test]
    fn csv_rows_match_expected_shape() {
        let trade = Trade {
            venue_time: 40,
            price: Decimal::from(100),
            quantity: 4,
            buy_order_id: OrderId(1),
            sell_order_id: OrderId(2),
        };
        assert_eq!(trade.to_csv_row(), "40,100,4,1,2");

        let snap = MarketSnapshot {
            venue_time: 40,
            best_ask: None,
            best_bid: Some(Decimal::from(100)),
            volume: 6,
        };
        assert_eq!(snap.to_csv_row(), "40,,100,6");
    }
}
