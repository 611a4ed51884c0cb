//! The matching engine: both side books, the order registries, and the
//! per-event processing entry points.
//!
//! A new-order event only registers a [`PrimaryOrder`]; nothing rests on the
//! book until an execution event arrives. The execution's quantity is first
//! applied to the order, then treated as marketable against the opposite
//! book, and any unmatched remainder rests on the order's own side. Trades
//! print at the resting order's price. The engine is strictly single-threaded;
//! every mutation goes through [`MatchingEngine::process_event`] or the typed
//! entry points below, in arrival order.

use crate::book::SideBook;
use crate::error::EngineError;
use crate::level::RestingEntry;
use crate::order::PrimaryOrder;
use crate::output::{
    DepthSnapshot, MarketSnapshot, MemorySnapshotSink, MemoryTradeSink, SnapshotSink, Trade,
    TradeSink,
};
use crate::types::{Deletion, EntryKey, Event, Execution, NewOrder, OrderId, Side};
use log::{debug, info};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Single-instrument matching engine.
///
/// Owns the bid and ask [`SideBook`]s and the open/closed order registries.
/// Trades and market snapshots are handed to the sinks supplied at
/// construction; the engine never persists anything itself.
pub struct MatchingEngine {
    bids: SideBook,
    asks: SideBook,
    open: HashMap<OrderId, PrimaryOrder>,
    closed: Vec<PrimaryOrder>,
    trade_sink: Arc<dyn TradeSink>,
    snapshot_sink: Arc<dyn SnapshotSink>,
}

impl MatchingEngine {
    pub fn new(trade_sink: Arc<dyn TradeSink>, snapshot_sink: Arc<dyn SnapshotSink>) -> Self {
        Self {
            bids: SideBook::new(Side::Buy),
            asks: SideBook::new(Side::Sell),
            open: HashMap::new(),
            closed: Vec::new(),
            trade_sink,
            snapshot_sink,
        }
    }

    /// Engine wired to fresh in-memory sinks; returns the sink handles so the
    /// caller can read trades and snapshots back.
    pub fn with_memory_sinks() -> (Self, MemoryTradeSink, MemorySnapshotSink) {
        let trades = MemoryTradeSink::new();
        let snapshots = MemorySnapshotSink::new();
        let engine = Self::new(Arc::new(trades.clone()), Arc::new(snapshots.clone()));
        (engine, trades, snapshots)
    }

    /// Dispatches one validated event. Returns the trades the event produced
    /// (empty for new-order and deletion events).
    pub fn process_event(&mut self, event: &Event) -> Result<Vec<Trade>, EngineError> {
        match event {
            Event::New(msg) => self.process_new(msg).map(|_| Vec::new()),
            Event::Execute(msg) => self.process_execution(msg),
            Event::Delete(msg) => self.process_deletion(msg).map(|_| Vec::new()),
        }
    }

    /// Admits an order: registers a [`PrimaryOrder`] in the open registry.
    /// Never places anything on the book.
    pub fn process_new(&mut self, msg: &NewOrder) -> Result<(), EngineError> {
        if msg.quantity == 0 {
            return Err(EngineError::InvalidEvent(format!(
                "new order {} with zero quantity",
                msg.order_id
            )));
        }
        if msg.price <= Decimal::ZERO {
            return Err(EngineError::InvalidEvent(format!(
                "new order {} with non-positive price {}",
                msg.order_id, msg.price
            )));
        }
        if self.open.contains_key(&msg.order_id) {
            return Err(EngineError::DuplicateOrder(msg.order_id));
        }
        debug!(
            "order admitted id={} side={:?} price={} qty={}",
            msg.order_id, msg.side, msg.price, msg.quantity
        );
        self.open.insert(msg.order_id, PrimaryOrder::new(msg));
        Ok(())
    }

    /// Applies an execution: decrements the order's remaining quantity by the
    /// full event quantity, crosses the opposite book, rests the remainder on
    /// the same side, and emits trades plus one market snapshot if anything
    /// matched.
    pub fn process_execution(&mut self, msg: &Execution) -> Result<Vec<Trade>, EngineError> {
        if msg.quantity == 0 {
            return Err(EngineError::InvalidEvent(format!(
                "execution on order {} with zero quantity",
                msg.order_id
            )));
        }
        let order = self
            .open
            .get_mut(&msg.order_id)
            .ok_or(EngineError::UnknownOrder(msg.order_id))?;
        order.apply_execution(msg)?;
        let (side, price, priority) = (order.side, order.price, order.priority);

        let (remaining, fills) = match side {
            Side::Buy => self.asks.match_incoming(price, msg.quantity)?,
            Side::Sell => self.bids.match_incoming(price, msg.quantity)?,
        };

        let mut trades = Vec::with_capacity(fills.len());
        for fill in &fills {
            let (buy_id, sell_id) = match side {
                Side::Buy => (msg.order_id, fill.maker_order_id),
                Side::Sell => (fill.maker_order_id, msg.order_id),
            };
            trades.push(Trade {
                venue_time: msg.venue_time,
                price: fill.price,
                quantity: fill.quantity,
                buy_order_id: buy_id,
                sell_order_id: sell_id,
            });
            if fill.maker_fully_filled {
                if let Some(maker) = self.open.get_mut(&fill.maker_order_id) {
                    maker.clear_entry(fill.key);
                }
                self.retire_if_done(fill.maker_order_id);
            }
        }

        if remaining > 0 {
            let key = EntryKey {
                order_id: msg.order_id,
                venue_time: msg.venue_time,
            };
            let entry = RestingEntry {
                key,
                order_id: msg.order_id,
                side,
                price,
                quantity: remaining,
                priority,
            };
            match side {
                Side::Buy => self.bids.insert_entry(entry)?,
                Side::Sell => self.asks.insert_entry(entry)?,
            }
            if let Some(order) = self.open.get_mut(&msg.order_id) {
                order.track_entry(key);
            }
        }
        self.retire_if_done(msg.order_id);

        if !trades.is_empty() {
            for trade in &trades {
                info!(
                    "trade venue_time={} price={} qty={} buy={} sell={}",
                    trade.venue_time,
                    trade.price,
                    trade.quantity,
                    trade.buy_order_id,
                    trade.sell_order_id
                );
                self.trade_sink.accept(trade);
            }
            let snapshot = self.market_snapshot(msg.venue_time);
            self.snapshot_sink.accept(&snapshot);
        }
        Ok(trades)
    }

    /// Cancels an order: purges every resting entry it still owns from its
    /// side's book, marks it canceled, and moves it to the closed set.
    pub fn process_deletion(&mut self, msg: &Deletion) -> Result<(), EngineError> {
        let mut order = self
            .open
            .remove(&msg.order_id)
            .ok_or(EngineError::UnknownOrder(msg.order_id))?;
        let keys: Vec<EntryKey> = order.resting.drain(..).collect();
        for key in keys {
            let removed = match order.side {
                Side::Buy => self.bids.remove_entry(key, false),
                Side::Sell => self.asks.remove_entry(key, false),
            };
            if let Err(e) = removed {
                self.open.insert(order.order_id, order);
                return Err(e);
            }
        }
        order.apply_deletion(msg);
        info!("order canceled id={}", msg.order_id);
        self.closed.push(order);
        Ok(())
    }

    /// Retires an order once it is fully executed and nothing of it rests on
    /// the book. An order with remaining zero but live resting quantity stays
    /// open until that quantity is consumed or deleted.
    fn retire_if_done(&mut self, order_id: OrderId) {
        let done = self
            .open
            .get(&order_id)
            .map_or(false, |o| o.is_filled() && !o.has_resting());
        if done {
            if let Some(order) = self.open.remove(&order_id) {
                debug!("order retired id={}", order_id);
                self.closed.push(order);
            }
        }
    }

    pub fn market_snapshot(&self, venue_time: u64) -> MarketSnapshot {
        MarketSnapshot {
            venue_time,
            best_ask: self.asks.best_price(),
            best_bid: self.bids.best_price(),
            volume: self.bids.volume() + self.asks.volume(),
        }
    }

    pub fn depth_snapshot(&self, venue_time: u64, levels: usize) -> DepthSnapshot {
        DepthSnapshot {
            venue_time,
            asks: self.asks.depth(levels),
            bids: self.bids.depth(levels),
        }
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.best_price()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.best_price()
    }

    pub fn bids(&self) -> &SideBook {
        &self.bids
    }

    pub fn asks(&self) -> &SideBook {
        &self.asks
    }

    pub fn open_order(&self, order_id: OrderId) -> Option<&PrimaryOrder> {
        self.open.get(&order_id)
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn open_orders(&self) -> impl Iterator<Item = &PrimaryOrder> {
        self.open.values()
    }

    pub fn closed_orders(&self) -> &[PrimaryOrder] {
        &self.closed
    }
}

impl fmt::Display for MatchingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "================= Asks =================")?;
        write!(f, "{}", self.asks)?;
        writeln!(f, "================= Bids =================")?;
        write!(f, "{}", self.bids)?;
        writeln!(
            f,
            "open orders: {}  closed orders: {}",
            self.open.len(),
            self.closed.len()
        )
    }
}
