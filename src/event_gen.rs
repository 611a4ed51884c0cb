//! Synthetic event stream generator.
//!
//! Deterministic, configurable A/E/D streams for replay tests and benchmarks.
//! Same seed produces the same sequence. Streams are always well-formed:
//! executions and deletions only reference admitted orders, execution
//! quantities never exceed what remains, and queue positions are unique.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::types::{Deletion, Event, Execution, NewOrder, OrderId, Side};

/// Configuration for the synthetic stream. All ranges are inclusive.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// RNG seed. Same seed, same stream.
    pub seed: u64,
    /// Number of events to generate when collecting.
    pub num_events: usize,
    /// Instrument name stamped on new-order events.
    pub instrument: String,
    /// Price range for new orders.
    pub price_min: i64,
    pub price_max: i64,
    /// Quantity range for new orders.
    pub quantity_min: u64,
    pub quantity_max: u64,
    /// Probability of a new-order event (0.0..=1.0).
    pub new_ratio: f64,
    /// Probability of a deletion event; the rest are executions.
    pub delete_ratio: f64,
    /// Probability of Buy for new orders.
    pub buy_ratio: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_events: 1000,
            instrument: "SYN".into(),
            price_min: 95,
            price_max: 105,
            quantity_min: 1,
            quantity_max: 100,
            new_ratio: 0.4,
            delete_ratio: 0.1,
            buy_ratio: 0.5,
        }
    }
}

/// Deterministic event stream. Tracks which orders are still referencable so
/// every generated event is valid for the engine.
pub struct StreamGenerator {
    rng: StdRng,
    config: StreamConfig,
    next_order_id: u64,
    next_priority: u64,
    venue_time: u64,
    /// Orders that may still receive E/D events: (id, unexecuted quantity).
    open: Vec<(OrderId, u64)>,
}

impl StreamGenerator {
    pub fn new(config: StreamConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            rng,
            config,
            next_order_id: 1,
            next_priority: 1,
            venue_time: 0,
            open: Vec::new(),
        }
    }

    /// Generates the next event, advancing ids, clocks, and the RNG.
    pub fn next_event(&mut self) -> Event {
        self.venue_time += 1;
        let roll = self.rng.gen::<f64>();
        if self.open.is_empty() || roll < self.config.new_ratio {
            self.gen_new_order()
        } else if roll < self.config.new_ratio + self.config.delete_ratio {
            self.gen_deletion()
        } else {
            self.gen_execution()
        }
    }

    /// Collects `num_events` events.
    pub fn all_events(mut self) -> Vec<Event> {
        (0..self.config.num_events)
            .map(|_| self.next_event())
            .collect()
    }

    fn gen_new_order(&mut self) -> Event {
        let order_id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        let priority = self.next_priority;
        self.next_priority += 1;
        let side = if self.rng.gen::<f64>() < self.config.buy_ratio {
            Side::Buy
        } else {
            Side::Sell
        };
        let price = Decimal::from(
            self.rng
                .gen_range(self.config.price_min..=self.config.price_max),
        );
        let quantity = self
            .rng
            .gen_range(self.config.quantity_min..=self.config.quantity_max);
        self.open.push((order_id, quantity));
        Event::New(NewOrder {
            network_time: self.venue_time,
            venue_time: self.venue_time,
            instrument: self.config.instrument.clone(),
            side,
            price,
            priority,
            quantity,
            order_id,
        })
    }

    fn gen_execution(&mut self) -> Event {
        let i = self.rng.gen_range(0..self.open.len());
        let (order_id, remaining) = self.open[i];
        let quantity = self.rng.gen_range(1..=remaining);
        if quantity == remaining {
            self.open.swap_remove(i);
        } else {
            self.open[i].1 -= quantity;
        }
        Event::Execute(Execution {
            network_time: self.venue_time,
            venue_time: self.venue_time,
            order_id,
            quantity,
        })
    }

    fn gen_deletion(&mut self) -> Event {
        let i = self.rng.gen_range(0..self.open.len());
        let (order_id, _) = self.open.swap_remove(i);
        Event::Delete(Deletion {
            network_time: self.venue_time,
            venue_time: self.venue_time,
            order_id,
        })
    }
}
