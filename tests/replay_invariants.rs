//! Property-based and deterministic invariant tests.
//!
//! Uses proptest to generate (seed, num_events); replays synthetic A/E/D
//! streams into the engine and asserts: volume accounting is consistent, the
//! book is never crossed, and order quantity is conserved against recorded
//! execution history. Deterministic replay: same seed, same outcome.

use lob_replay::event_gen::{StreamConfig, StreamGenerator};
use lob_replay::replay::replay_events;
use lob_replay::{MatchingEngine, OrderEvent, PrimaryOrder};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn executed_total(order: &PrimaryOrder) -> u64 {
    order
        .history
        .iter()
        .map(|event| match event {
            OrderEvent::Executed { quantity, .. } => *quantity,
            OrderEvent::Deleted { .. } => 0,
        })
        .sum()
}

/// Invariant: remaining never exceeds the original quantity, and the executed
/// history accounts exactly for the difference.
fn assert_quantity_conserved(order: &PrimaryOrder) {
    assert!(
        order.remaining <= order.quantity,
        "order {} remaining {} exceeds quantity {}",
        order.order_id,
        order.remaining,
        order.quantity
    );
    assert_eq!(
        order.quantity - order.remaining,
        executed_total(order),
        "order {} history does not account for executed quantity",
        order.order_id
    );
}

/// Invariant: best_bid < best_ask when both exist.
fn assert_no_crossed_book(engine: &MatchingEngine) {
    if let (Some(bid), Some(ask)) = (engine.best_bid(), engine.best_ask()) {
        assert!(bid < ask, "book crossed: bid {} >= ask {}", bid, ask);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// For any (seed, num_events) in range: after replaying the generated
    /// stream, volume accounting holds on both sides, the book is not
    /// crossed, and every order's quantity is conserved.
    #[test]
    fn prop_invariants_hold_after_replay(seed in 0u64..100_000u64, num_events in 10usize..400usize) {
        let events = StreamGenerator::new(StreamConfig {
            seed,
            num_events,
            ..Default::default()
        })
        .all_events();
        let (mut engine, _, _) = MatchingEngine::with_memory_sinks();
        replay_events(&mut engine, &events).unwrap();

        prop_assert!(engine.bids().volume_is_consistent());
        prop_assert!(engine.asks().volume_is_consistent());
        assert_no_crossed_book(&engine);
        for order in engine.open_orders() {
            assert_quantity_conserved(order);
        }
        for order in engine.closed_orders() {
            assert_quantity_conserved(order);
        }
    }

    /// Trades never print zero quantity or a non-positive price, and buyer
    /// and seller are always distinct orders.
    #[test]
    fn prop_trades_are_well_formed(seed in 0u64..100_000u64) {
        let events = StreamGenerator::new(StreamConfig {
            seed,
            num_events: 200,
            ..Default::default()
        })
        .all_events();
        let (mut engine, trades, _) = MatchingEngine::with_memory_sinks();
        replay_events(&mut engine, &events).unwrap();

        for trade in trades.trades() {
            prop_assert!(trade.quantity > 0);
            prop_assert!(trade.price > Decimal::ZERO);
            prop_assert_ne!(trade.buy_order_id, trade.sell_order_id);
        }
    }
}

/// Deterministic replay: same seed produces the same trades and the same
/// final book.
#[test]
fn deterministic_replay_same_seed_same_outcome() {
    let config = StreamConfig {
        seed: 999,
        num_events: 300,
        ..Default::default()
    };

    let events1 = StreamGenerator::new(config.clone()).all_events();
    let (mut engine1, trades1, snaps1) = MatchingEngine::with_memory_sinks();
    let summary1 = replay_events(&mut engine1, &events1).unwrap();

    let events2 = StreamGenerator::new(config).all_events();
    let (mut engine2, trades2, snaps2) = MatchingEngine::with_memory_sinks();
    let summary2 = replay_events(&mut engine2, &events2).unwrap();

    assert_eq!(summary1, summary2);
    assert_eq!(trades1.trades(), trades2.trades());
    assert_eq!(snaps1.snapshots(), snaps2.snapshots());
    assert_eq!(engine1.best_bid(), engine2.best_bid());
    assert_eq!(engine1.best_ask(), engine2.best_ask());
    assert_eq!(
        engine1.depth_snapshot(0, usize::MAX),
        engine2.depth_snapshot(0, usize::MAX)
    );
}
