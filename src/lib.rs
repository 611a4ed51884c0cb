//! Deterministic limit order book reconstruction from recorded exchange
//! event streams.
//!
//! The feed is a time-ordered sequence of three message types: `A` admits an
//! order, `E` delivers executable quantity to the market, `D` cancels. An
//! admitted order does not rest on the book; only an execution's unmatched
//! remainder does. Replaying the same file always produces the same trades,
//! snapshots, and final book.
//!
//! ```
//! use lob_replay::{Event, MatchingEngine, NewOrder, Execution, OrderId, Side};
//! use rust_decimal::Decimal;
//!
//! let (mut engine, trades, _snapshots) = MatchingEngine::with_memory_sinks();
//! engine.process_event(&Event::New(NewOrder {
//!     network_time: 1,
//!     venue_time: 10,
//!     instrument: "GARAN".into(),
//!     side: Side::Buy,
//!     price: Decimal::from(100),
//!     priority: 1,
//!     quantity: 10,
//!     order_id: OrderId(1),
//! }))?;
//! // nothing rests until the execution arrives
//! assert!(engine.best_bid().is_none());
//! engine.process_event(&Event::Execute(Execution {
//!     network_time: 2,
//!     venue_time: 20,
//!     order_id: OrderId(1),
//!     quantity: 10,
//! }))?;
//! assert_eq!(engine.best_bid(), Some(Decimal::from(100)));
//! assert!(trades.is_empty());
//! # Ok::<(), lob_replay::EngineError>(())
//! ```

pub mod book;
pub mod engine;
pub mod error;
pub mod event_gen;
pub mod feed;
pub mod level;
pub mod order;
pub mod output;
pub mod replay;
pub mod types;

pub use book::{Fill, SideBook};
pub use engine::MatchingEngine;
pub use error::{EngineError, FeedError};
pub use event_gen::{StreamConfig, StreamGenerator};
pub use feed::parse_line;
pub use level::{PriceLevelQueue, RestingEntry};
pub use order::{OrderEvent, OrderState, PrimaryOrder};
pub use output::{
    DepthLevel, DepthSnapshot, MarketSnapshot, MemorySnapshotSink, MemoryTradeSink, SnapshotSink,
    Trade, TradeSink,
};
pub use replay::{ReplayConfig, ReplayError, ReplaySummary};
pub use types::{Deletion, EntryKey, Event, Execution, NewOrder, OrderId, Side};
