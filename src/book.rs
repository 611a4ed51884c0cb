//! One side of the book: price-indexed levels with best-price bookkeeping.
//!
//! Prices map to [`PriceLevelQueue`]s through an ordered map; running min and
//! max price are cached fields updated incrementally on level creation and
//! removal, so best-price lookup never walks the tree. A key index gives O(1)
//! location of any resting entry for cancellation.

use crate::error::EngineError;
use crate::level::{PriceLevelQueue, RestingEntry};
use crate::output::DepthLevel;
use crate::types::{EntryKey, OrderId, Side};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Result of consuming liquidity from a resting entry during matching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fill {
    pub key: EntryKey,
    pub maker_order_id: OrderId,
    /// The resting order's price (trades print at this price, not the
    /// incoming order's).
    pub price: Decimal,
    pub quantity: u64,
    /// True if the resting entry was fully consumed and removed.
    pub maker_fully_filled: bool,
}

/// The full price-indexed book for one side (bid or ask).
#[derive(Clone, Debug)]
pub struct SideBook {
    side: Side,
    levels: BTreeMap<Decimal, PriceLevelQueue>,
    /// Entry key -> (price, priority): where the entry currently sits.
    index: HashMap<EntryKey, (Decimal, u64)>,
    volume: u64,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
}

impl SideBook {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            index: HashMap::new(),
            volume: 0,
            min_price: None,
            max_price: None,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Total resting quantity on this side.
    pub fn volume(&self) -> u64 {
        self.volume
    }

    /// Number of resting entries on this side.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: EntryKey) -> bool {
        self.index.contains_key(&key)
    }

    pub fn min_price(&self) -> Option<Decimal> {
        self.min_price
    }

    pub fn max_price(&self) -> Option<Decimal> {
        self.max_price
    }

    /// Best price: highest for the bid side, lowest for the ask side. Cached,
    /// not recomputed.
    pub fn best_price(&self) -> Option<Decimal> {
        match self.side {
            Side::Buy => self.max_price,
            Side::Sell => self.min_price,
        }
    }

    /// Places a resting entry, creating its price level if absent and
    /// updating the key index, side volume, and best-price bookkeeping.
    pub fn insert_entry(&mut self, entry: RestingEntry) -> Result<(), EngineError> {
        if self.index.contains_key(&entry.key) {
            return Err(EngineError::DuplicateEntry(entry.key));
        }
        let price = entry.price;
        let key = entry.key;
        let priority = entry.priority;
        let quantity = entry.quantity;
        let is_new_level = !self.levels.contains_key(&price);
        let level = self.levels.entry(price).or_default();
        if let Err(e) = level.push(entry) {
            if level.is_empty() {
                self.levels.remove(&price);
            }
            return Err(e);
        }
        if is_new_level {
            self.note_level_added(price);
        }
        self.index.insert(key, (price, priority));
        self.volume += quantity;
        Ok(())
    }

    /// Removes a specific entry by key: via head pop when the caller knows it
    /// is the head (full match), or by priority for mid-queue cancellation.
    /// Drops the level if it empties and fails over best price to the next
    /// extreme in the ordered price map.
    pub fn remove_entry(&mut self, key: EntryKey, from_head: bool) -> Result<RestingEntry, EngineError> {
        let (price, priority) = self
            .index
            .remove(&key)
            .ok_or(EngineError::EntryMissing(key))?;
        let level = self
            .levels
            .get_mut(&price)
            .ok_or(EngineError::EntryMissing(key))?;
        let entry = if from_head {
            level.pop_head()?
        } else {
            level
                .remove_at(key, priority)
                .ok_or(EngineError::EntryMissing(key))?
        };
        let now_empty = level.is_empty();
        self.volume -= entry.quantity;
        if now_empty {
            self.remove_level(price);
        }
        Ok(entry)
    }

    /// Crossing loop: consumes resting heads at successive best prices while
    /// the incoming order's limit crosses and quantity remains. Partial head
    /// consumption reduces the head in place; full consumption removes it.
    /// Returns the unmatched remainder and the fills in match order.
    pub fn match_incoming(
        &mut self,
        limit_price: Decimal,
        quantity: u64,
    ) -> Result<(u64, Vec<Fill>), EngineError> {
        let mut remaining = quantity;
        let mut fills = Vec::new();
        while remaining > 0 {
            let Some(best) = self.best_price() else { break };
            let crosses = match self.side {
                // incoming buy against this ask book
                Side::Sell => limit_price >= best,
                // incoming sell against this bid book
                Side::Buy => limit_price <= best,
            };
            if !crosses {
                break;
            }
            let (head_key, head_order_id, head_qty) = {
                let level = self.levels.get(&best).ok_or(EngineError::EmptyLevel)?;
                let head = level.peek_head()?;
                (head.key, head.order_id, head.quantity)
            };
            let matched = remaining.min(head_qty);
            if matched < head_qty {
                if let Some(level) = self.levels.get_mut(&best) {
                    level.reduce_head(matched)?;
                }
                self.volume -= matched;
                fills.push(Fill {
                    key: head_key,
                    maker_order_id: head_order_id,
                    price: best,
                    quantity: matched,
                    maker_fully_filled: false,
                });
            } else {
                self.remove_entry(head_key, true)?;
                fills.push(Fill {
                    key: head_key,
                    maker_order_id: head_order_id,
                    price: best,
                    quantity: matched,
                    maker_fully_filled: true,
                });
            }
            remaining -= matched;
        }
        Ok((remaining, fills))
    }

    /// Best `levels` price levels with aggregate volumes: asks ascending,
    /// bids descending.
    pub fn depth(&self, levels: usize) -> Vec<DepthLevel> {
        let map = |(price, queue): (&Decimal, &PriceLevelQueue)| DepthLevel {
            price: *price,
            volume: queue.volume(),
        };
        match self.side {
            Side::Sell => self.levels.iter().take(levels).map(map).collect(),
            Side::Buy => self.levels.iter().rev().take(levels).map(map).collect(),
        }
    }

    /// True when the cached side volume agrees with both the per-level
    /// volumes and the raw entry quantities.
    pub fn volume_is_consistent(&self) -> bool {
        let level_sum: u64 = self.levels.values().map(|l| l.volume()).sum();
        let entry_sum: u64 = self
            .levels
            .values()
            .flat_map(|l| l.iter())
            .map(|e| e.quantity)
            .sum();
        level_sum == self.volume && entry_sum == self.volume
    }

    fn note_level_added(&mut self, price: Decimal) {
        if self.max_price.map_or(true, |m| price > m) {
            self.max_price = Some(price);
        }
        if self.min_price.map_or(true, |m| price < m) {
            self.min_price = Some(price);
        }
    }

    fn remove_level(&mut self, price: Decimal) {
        self.levels.remove(&price);
        if self.min_price == Some(price) {
            self.min_price = self.levels.keys().next().copied();
        }
        if self.max_price == Some(price) {
            self.max_price = self.levels.keys().next_back().copied();
        }
    }
}

impl fmt::Display for SideBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (price, level) in self.levels.iter().rev() {
            writeln!(
                f,
                "| p: {:>8} | tot: {:>4} | vol: {:>7} |",
                price,
                level.len(),
                level.volume()
            )?;
        }
        writeln!(
            f,
            "| volume: {:>9} | orders: {:>8} |",
            self.volume,
            self.index.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, side: Side, price: i64, priority: u64, qty: u64) -> RestingEntry {
        RestingEntry {
            key: EntryKey {
                order_id: OrderId(id),
                venue_time: id,
            },
            order_id: OrderId(id),
            side,
            price: Decimal::from(price),
            quantity: qty,
            priority,
        }
    }

    #[test]
    fn best_price_is_max_for_bids_min_for_asks() {
        let mut bids = SideBook::new(Side::Buy);
        bids.insert_entry(entry(1, Side::Buy, 99, 1, 10)).unwrap();
        bids.insert_entry(entry(2, Side::Buy, 101, 2, 10)).unwrap();
        assert_eq!(bids.best_price(), Some(Decimal::from(101)));

        let mut asks = SideBook::new(Side::Sell);
        asks.insert_entry(entry(3, Side::Sell, 105, 3, 10)).unwrap();
        asks.insert_entry(entry(4, Side::Sell, 103, 4, 10)).unwrap();
        assert_eq!(asks.best_price(), Some(Decimal::from(103)));
    }

    #[test]
    fn removing_last_entry_at_best_fails_over_to_next_extreme() {
        let mut asks = SideBook::new(Side::Sell);
        let best = entry(1, Side::Sell, 100, 1, 5);
        asks.insert_entry(best.clone()).unwrap();
        asks.insert_entry(entry(2, Side::Sell, 102, 2, 5)).unwrap();
        asks.remove_entry(best.key, false).unwrap();
        assert_eq!(asks.best_price(), Some(Decimal::from(102)));
        asks.remove_entry(
            EntryKey {
                order_id: OrderId(2),
                venue_time: 2,
            },
            false,
        )
        .unwrap();
        assert_eq!(asks.best_price(), None);
        assert_eq!(asks.volume(), 0);
    }

    #[test]
    fn duplicate_entry_key_is_a_fatal_rejection() {
        let mut bids = SideBook::new(Side::Buy);
        bids.insert_entry(entry(1, Side::Buy, 100, 1, 5)).unwrap();
        let err = bids.insert_entry(entry(1, Side::Buy, 100, 2, 3)).unwrap_err();
        assert_eq!(
            err,
            EngineError::DuplicateEntry(EntryKey {
                order_id: OrderId(1),
                venue_time: 1,
            })
        );
        assert!(err.is_fatal());
        assert_eq!(bids.volume(), 5);
        assert_eq!(bids.len(), 1);
    }

    #[test]
    fn depth_orders_asks_ascending_bids_descending_and_truncates() {
        let mut asks = SideBook::new(Side::Sell);
        for (i, price) in [104, 101, 103, 102].into_iter().enumerate() {
            let id = i as u64 + 1;
            asks.insert_entry(entry(id, Side::Sell, price, id, 5)).unwrap();
        }
        // second entry at 101: level volume aggregates
        asks.insert_entry(entry(9, Side::Sell, 101, 9, 7)).unwrap();
        let depth = asks.depth(3);
        let prices: Vec<i64> = depth.iter().map(|l| l.price.try_into().unwrap()).collect();
        assert_eq!(prices, vec![101, 102, 103]);
        assert_eq!(depth[0].volume, 12);

        let mut bids = SideBook::new(Side::Buy);
        for (i, price) in [97, 99, 96, 98].into_iter().enumerate() {
            let id = i as u64 + 1;
            bids.insert_entry(entry(id, Side::Buy, price, id, 5)).unwrap();
        }
        let depth = bids.depth(3);
        let prices: Vec<i64> = depth.iter().map(|l| l.price.try_into().unwrap()).collect();
        assert_eq!(prices, vec![99, 98, 97]);
        // a wider request returns everything
        assert_eq!(bids.depth(10).len(), 4);
    }

    #[test]
    fn remove_entry_unknown_key_fails() {
        let mut bids = SideBook::new(Side::Buy);
        let err = bids
            .remove_entry(
                EntryKey {
                    order_id: OrderId(9),
                    venue_time: 9,
                },
                false,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::EntryMissing(_)));
    }

    #[test]
    fn mid_queue_removal_preserves_remaining_order() {
        let mut bids = SideBook::new(Side::Buy);
        bids.insert_entry(entry(1, Side::Buy, 100, 10, 5)).unwrap();
        bids.insert_entry(entry(2, Side::Buy, 100, 20, 6)).unwrap();
        bids.insert_entry(entry(3, Side::Buy, 100, 30, 7)).unwrap();
        bids.remove_entry(
            EntryKey {
                order_id: OrderId(2),
                venue_time: 2,
            },
            false,
        )
        .unwrap();
        assert_eq!(bids.volume(), 12);
        let (remaining, fills) = bids.match_incoming(Decimal::from(100), 12).unwrap();
        assert_eq!(remaining, 0);
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].maker_order_id, OrderId(1));
        assert_eq!(fills[1].maker_order_id, OrderId(3));
    }

    #[test]
    fn match_incoming_partial_head_stays_at_head() {
        let mut asks = SideBook::new(Side::Sell);
        asks.insert_entry(entry(1, Side::Sell, 100, 1, 10)).unwrap();
        let (remaining, fills) = asks.match_incoming(Decimal::from(100), 4).unwrap();
        assert_eq!(remaining, 0);
        assert_eq!(fills.len(), 1);
        assert!(!fills[0].maker_fully_filled);
        assert_eq!(asks.volume(), 6);
        assert_eq!(asks.best_price(), Some(Decimal::from(100)));
    }

    #[test]
    fn match_incoming_walks_levels_in_price_order() {
        let mut asks = SideBook::new(Side::Sell);
        asks.insert_entry(entry(1, Side::Sell, 101, 1, 5)).unwrap();
        asks.insert_entry(entry(2, Side::Sell, 100, 2, 5)).unwrap();
        asks.insert_entry(entry(3, Side::Sell, 102, 3, 5)).unwrap();
        // buy limit 101: consumes 100 then 101, leaves 102
        let (remaining, fills) = asks.match_incoming(Decimal::from(101), 12).unwrap();
        assert_eq!(remaining, 2);
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].price, Decimal::from(100));
        assert_eq!(fills[1].price, Decimal::from(101));
        assert_eq!(asks.best_price(), Some(Decimal::from(102)));
    }

    #[test]
    fn match_incoming_respects_priority_within_level() {
        let mut bids = SideBook::new(Side::Buy);
        bids.insert_entry(entry(1, Side::Buy, 100, 20, 5)).unwrap();
        bids.insert_entry(entry(2, Side::Buy, 100, 10, 5)).unwrap();
        let (_, fills) = bids.match_incoming(Decimal::from(100), 5).unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].maker_order_id, OrderId(2), "lower priority key matches first");
    }

    #[test]
    fn non_crossing_limit_matches_nothing() {
        let mut asks = SideBook::new(Side::Sell);
        asks.insert_entry(entry(1, Side::Sell, 100, 1, 10)).unwrap();
        let (remaining, fills) = asks.match_incoming(Decimal::from(99), 10).unwrap();
        assert_eq!(remaining, 10);
        assert!(fills.is_empty());
        assert_eq!(asks.volume(), 10);
    }

    #[test]
    fn volume_consistency_holds_through_mutations() {
        let mut bids = SideBook::new(Side::Buy);
        for i in 1..=5u64 {
            bids.insert_entry(entry(i, Side::Buy, 95 + i as i64, i, i * 2))
                .unwrap();
        }
        assert!(bids.volume_is_consistent());
        bids.match_incoming(Decimal::from(98), 7).unwrap();
        assert!(bids.volume_is_consistent());
        bids.remove_entry(
            EntryKey {
                order_id: OrderId(2),
                venue_time: 2,
            },
            false,
        )
        .unwrap();
        assert!(bids.volume_is_consistent());
    }
}
