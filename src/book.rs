//! Per-symbol book: two price-time ordered sides, an order-reference index,
//! and the append-only trade/cross-trade/snapshot logs. See spec.md §4.2/§4.3.

use hashbrown::HashMap;
use smallvec::SmallVec;
use std::collections::BTreeMap;

use crate::error::BookError;
use crate::types::{LevelAgg, Order, OrderRef, Price, Side, SnapshotRow, Ts, TradeRecord};

/// Most configured depths stay well under this; `aggregate_levels` only
/// spills to the heap past it, which keeps `Book::snapshot` allocation-free
/// for the common case (spec.md §2's "hundreds of millions of messages").
const TYPICAL_DEPTH: usize = 16;

/// `(price, ts, ref)` flattened into a single ascending-orderable tuple.
/// The buy side negates price (`u32::MAX - price`) so that ascending
/// iteration yields best-price-first, matching the sell side's natural
/// ascending order — spec.md §9's "equivalently, store negated price."
type RawKey = (u32, u64, u64);

#[inline]
fn raw_key(side: Side, price: Price, ts: Ts, order_ref: OrderRef) -> RawKey {
    let price_component = match side {
        Side::Buy => u32::MAX - price.0,
        Side::Sell => price.0,
    };
    (price_component, ts.0, order_ref.0)
}

/// Where an order lives: which side's map, and the key to remove it with,
/// so removal never needs to scan. Mirrors spec.md §9's `Handle`.
#[derive(Clone, Copy)]
struct Handle {
    side: Side,
    key: RawKey,
}

pub struct Book {
    symbol: String,
    depth: usize,
    buy: BTreeMap<RawKey, Order>,
    sell: BTreeMap<RawKey, Order>,
    orders: HashMap<u64, Handle>,
    trades: Vec<TradeRecord>,
    cross_trades: Vec<TradeRecord>,
    history: Vec<SnapshotRow>,
}

impl Book {
    pub fn new(symbol: String, depth: usize) -> Self {
        assert!(depth > 0, "depth must be positive");
        Self {
            symbol,
            depth,
            buy: BTreeMap::new(),
            sell: BTreeMap::new(),
            orders: HashMap::new(),
            trades: Vec::new(),
            cross_trades: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn cross_trades(&self) -> &[TradeRecord] {
        &self.cross_trades
    }

    pub fn history(&self) -> &[SnapshotRow] {
        &self.history
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    fn side_map_mut(&mut self, side: Side) -> &mut BTreeMap<RawKey, Order> {
        match side {
            Side::Buy => &mut self.buy,
            Side::Sell => &mut self.sell,
        }
    }

    /// Inserts a fresh order, bypassing the duplicate-ref fallback; used by
    /// `add_order` and `replace`, both of which have already decided the key
    /// is free (or evicted whatever occupied it).
    fn insert(&mut self, order: Order) {
        let key = raw_key(order.side, order.price, order.ts, order.order_ref);
        self.side_map_mut(order.side).insert(key, order);
        self.orders.insert(
            order.order_ref.0,
            Handle {
                side: order.side,
                key,
            },
        );
    }

    /// `AddOrder(order)`. `DuplicateRef` on a ref already present: the prior
    /// order is evicted and replaced (spec.md §7's documented fallback); the
    /// error is still returned so the caller can count and log it.
    pub fn add_order(&mut self, order: Order) -> Result<(), BookError> {
        if self.orders.contains_key(&order.order_ref.0) {
            let _ = self.remove_order(order.order_ref);
            self.insert(order);
            return Err(BookError::DuplicateRef(order.order_ref));
        }
        self.insert(order);
        Ok(())
    }

    /// `RemoveOrder(ref)`. `UnknownRef` if absent; no mutation in that case.
    pub fn remove_order(&mut self, order_ref: OrderRef) -> Result<(), BookError> {
        match self.orders.remove(&order_ref.0) {
            Some(handle) => {
                self.side_map_mut(handle.side).remove(&handle.key);
                Ok(())
            }
            None => Err(BookError::UnknownRef(order_ref)),
        }
    }

    /// `Execute(ref, ts, shares, price?, printable)`. Returns the trade
    /// record appended to `trades` when `printable`, so the engine can
    /// forward it to the sink without re-deriving the executed price.
    pub fn execute(
        &mut self,
        order_ref: OrderRef,
        ts: Ts,
        shares: u32,
        price: Option<Price>,
        printable: bool,
    ) -> Result<Option<TradeRecord>, BookError> {
        let handle = *self
            .orders
            .get(&order_ref.0)
            .ok_or(BookError::UnknownRef(order_ref))?;
        let order = self.side_map_mut(handle.side).get(&handle.key).copied().unwrap();
        let remaining = order.shares.saturating_sub(shares);
        let trade_price = price.unwrap_or(order.price);

        if remaining == 0 {
            self.remove_order(order_ref).ok();
        } else {
            self.side_map_mut(handle.side)
                .get_mut(&handle.key)
                .unwrap()
                .shares = remaining;
        }

        if printable {
            let trade = TradeRecord {
                ts,
                shares: u64::from(shares),
                price: trade_price,
            };
            self.trades.push(trade);
            Ok(Some(trade))
        } else {
            Ok(None)
        }
    }

    /// `Cancel(ref, shares)`. `InvalidShares` if `shares` exceeds what is
    /// resting (driving the order negative); treated as a full removal.
    pub fn cancel(&mut self, order_ref: OrderRef, shares: u32) -> Result<(), BookError> {
        let handle = *self
            .orders
            .get(&order_ref.0)
            .ok_or(BookError::UnknownRef(order_ref))?;
        let resting = self.side_map_mut(handle.side).get(&handle.key).unwrap().shares;

        if shares > resting {
            self.remove_order(order_ref).ok();
            return Err(BookError::InvalidShares {
                order_ref,
                requested: shares,
                resting,
            });
        }

        let new_shares = resting - shares;
        if new_shares == 0 {
            self.remove_order(order_ref).ok();
        } else {
            self.side_map_mut(handle.side)
                .get_mut(&handle.key)
                .unwrap()
                .shares = new_shares;
        }
        Ok(())
    }

    /// `Delete(ref)`.
    pub fn delete(&mut self, order_ref: OrderRef) -> Result<(), BookError> {
        self.remove_order(order_ref)
    }

    /// `Replace(old_ref, new_ref, new_shares, new_price, ts)`. Re-keys:
    /// time priority resets to the replace event's timestamp, per spec.md
    /// §9's resolved open question.
    pub fn replace(
        &mut self,
        old_ref: OrderRef,
        new_ref: OrderRef,
        new_shares: u32,
        new_price: Price,
        ts: Ts,
    ) -> Result<(), BookError> {
        let handle = *self
            .orders
            .get(&old_ref.0)
            .ok_or(BookError::UnknownRef(old_ref))?;
        let side = handle.side;
        self.remove_order(old_ref).ok();
        self.insert(Order {
            order_ref: new_ref,
            side,
            shares: new_shares,
            price: new_price,
            ts,
        });
        Ok(())
    }

    /// `RecordTrade(ts, shares, price)` — message `P`, non-cross. Returns
    /// the appended record so the engine can forward it to the sink
    /// without re-deriving the `u32` → `u64` shares conversion itself.
    pub fn record_trade(&mut self, ts: Ts, shares: u32, price: Price) -> TradeRecord {
        let trade = TradeRecord { ts, shares: u64::from(shares), price };
        self.trades.push(trade);
        trade
    }

    /// `RecordCrossTrade(ts, shares, price)` — message `Q`. `shares` is
    /// `u64`: the wire field is a genuine 8-byte quantity, unlike the
    /// 4-byte share counts elsewhere.
    pub fn record_cross_trade(&mut self, ts: Ts, shares: u64, price: Price) -> TradeRecord {
        let trade = TradeRecord { ts, shares, price };
        self.cross_trades.push(trade);
        trade
    }

    /// Materializes up to `depth` price levels per side, aggregating
    /// consecutive entries at the same price, and appends the row to
    /// `history`. See spec.md §4.3.
    pub fn snapshot(&mut self, ts: Ts) -> &SnapshotRow {
        let buy = aggregate_levels(self.buy.values(), self.depth);
        let sell = aggregate_levels(self.sell.values(), self.depth);
        self.history.push(SnapshotRow { ts, buy, sell });
        self.history.last().unwrap()
    }
}

fn aggregate_levels<'a>(
    orders: impl Iterator<Item = &'a Order>,
    depth: usize,
) -> Vec<Option<LevelAgg>> {
    let mut levels: SmallVec<[LevelAgg; TYPICAL_DEPTH]> = SmallVec::new();
    for order in orders {
        match levels.last_mut() {
            Some(last) if last.price == order.price => {
                last.shares += order.shares;
            }
            _ => {
                if levels.len() == depth {
                    break;
                }
                levels.push(LevelAgg {
                    price: order.price,
                    shares: order.shares,
                });
            }
        }
    }
    let mut rows: Vec<Option<LevelAgg>> = levels.into_iter().map(Some).collect();
    rows.resize(depth, None);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(order_ref: u64, side: Side, shares: u32, price: u32, ts: u64) -> Order {
        Order {
            order_ref: OrderRef(order_ref),
            side,
            shares,
            price: Price(price),
            ts: Ts(ts),
        }
    }

    #[test]
    fn add_then_snapshot() {
        let mut b = Book::new("TEST".into(), 5);
        b.add_order(order(10, Side::Buy, 100, 1_000_000, 1)).unwrap();
        let row = b.snapshot(Ts(1)).clone();
        assert_eq!(row.buy[0], Some(LevelAgg { price: Price(1_000_000), shares: 100 }));
        assert_eq!(row.sell[0], None);
    }

    #[test]
    fn aggregation_sums_same_price() {
        let mut b = Book::new("TEST".into(), 5);
        b.add_order(order(10, Side::Buy, 100, 1_000_000, 1)).unwrap();
        b.add_order(order(11, Side::Buy, 50, 1_000_000, 2)).unwrap();
        let row = b.snapshot(Ts(2)).clone();
        assert_eq!(row.buy[0], Some(LevelAgg { price: Price(1_000_000), shares: 150 }));
    }

    #[test]
    fn partial_execute_decrements_in_place() {
        let mut b = Book::new("TEST".into(), 5);
        b.add_order(order(10, Side::Buy, 100, 1_000_000, 1)).unwrap();
        b.execute(OrderRef(10), Ts(3), 30, None, true).unwrap();
        let row = b.snapshot(Ts(3)).clone();
        assert_eq!(row.buy[0], Some(LevelAgg { price: Price(1_000_000), shares: 70 }));
        assert_eq!(b.trades(), &[TradeRecord { ts: Ts(3), shares: 30, price: Price(1_000_000) }]);
    }

    #[test]
    fn full_execute_removes_order() {
        let mut b = Book::new("TEST".into(), 5);
        b.add_order(order(10, Side::Buy, 100, 1_000_000, 1)).unwrap();
        b.execute(OrderRef(10), Ts(4), 100, None, false).unwrap();
        let row = b.snapshot(Ts(4)).clone();
        assert_eq!(row.buy[0], None);
        assert_eq!(b.order_count(), 0);
    }

    #[test]
    fn execute_more_than_resting_removes_without_error() {
        let mut b = Book::new("TEST".into(), 5);
        b.add_order(order(10, Side::Buy, 100, 1_000_000, 1)).unwrap();
        assert!(b.execute(OrderRef(10), Ts(5), 500, None, false).is_ok());
        assert_eq!(b.order_count(), 0);
    }

    #[test]
    fn cancel_more_than_resting_is_invalid_shares_and_removes() {
        let mut b = Book::new("TEST".into(), 5);
        b.add_order(order(10, Side::Buy, 100, 1_000_000, 1)).unwrap();
        let err = b.cancel(OrderRef(10), 500).unwrap_err();
        assert!(matches!(err, BookError::InvalidShares { requested: 500, resting: 100, .. }));
        assert_eq!(b.order_count(), 0);
    }

    #[test]
    fn replace_resets_time_priority() {
        let mut b = Book::new("TEST".into(), 5);
        b.add_order(order(10, Side::Buy, 100, 1_000_000, 1)).unwrap();
        b.add_order(order(11, Side::Buy, 50, 1_000_000, 2)).unwrap();
        b.replace(OrderRef(10), OrderRef(12), 40, Price(1_000_000), Ts(5)).unwrap();
        let fifo: Vec<u64> = b.buy.values().map(|o| o.order_ref.0).collect();
        assert_eq!(fifo, vec![11, 12]);
    }

    #[test]
    fn duplicate_ref_replaces_prior_order() {
        let mut b = Book::new("TEST".into(), 5);
        b.add_order(order(10, Side::Buy, 100, 1_000_000, 1)).unwrap();
        let err = b.add_order(order(10, Side::Buy, 10, 2_000_000, 9)).unwrap_err();
        assert!(matches!(err, BookError::DuplicateRef(OrderRef(10))));
        assert_eq!(b.order_count(), 1);
        let row = b.snapshot(Ts(9)).clone();
        assert_eq!(row.buy[0], Some(LevelAgg { price: Price(2_000_000), shares: 10 }));
    }

    #[test]
    fn unknown_ref_drops_event_without_mutation() {
        let mut b = Book::new("TEST".into(), 5);
        b.add_order(order(10, Side::Buy, 100, 1_000_000, 1)).unwrap();
        let err = b.cancel(OrderRef(99), 1).unwrap_err();
        assert!(matches!(err, BookError::UnknownRef(OrderRef(99))));
        assert_eq!(b.order_count(), 1);
    }

    #[test]
    fn depth_boundary_no_empty_trailing_at_exact_depth() {
        let mut b = Book::new("TEST".into(), 2);
        b.add_order(order(1, Side::Buy, 10, 100, 1)).unwrap();
        b.add_order(order(2, Side::Buy, 10, 200, 2)).unwrap();
        let row = b.snapshot(Ts(2)).clone();
        assert!(row.buy[0].is_some());
        assert!(row.buy[1].is_some());
    }

    #[test]
    fn depth_boundary_last_level_empty_below_depth() {
        let mut b = Book::new("TEST".into(), 3);
        b.add_order(order(1, Side::Buy, 10, 100, 1)).unwrap();
        b.add_order(order(2, Side::Buy, 10, 200, 2)).unwrap();
        let row = b.snapshot(Ts(2)).clone();
        assert!(row.buy[0].is_some());
        assert!(row.buy[1].is_some());
        assert!(row.buy[2].is_none());
    }

    #[test]
    fn buy_side_iterates_best_price_first() {
        let mut b = Book::new("TEST".into(), 5);
        b.add_order(order(1, Side::Buy, 10, 100, 1)).unwrap();
        b.add_order(order(2, Side::Buy, 10, 300, 2)).unwrap();
        b.add_order(order(3, Side::Buy, 10, 200, 3)).unwrap();
        let prices: Vec<u32> = b.buy.values().map(|o| o.price.0).collect();
        assert_eq!(prices, vec![300, 200, 100]);
    }

    #[test]
    fn sell_side_iterates_best_price_first() {
        let mut b = Book::new("TEST".into(), 5);
        b.add_order(order(1, Side::Sell, 10, 300, 1)).unwrap();
        b.add_order(order(2, Side::Sell, 10, 100, 2)).unwrap();
        b.add_order(order(3, Side::Sell, 10, 200, 3)).unwrap();
        let prices: Vec<u32> = b.sell.values().map(|o| o.price.0).collect();
        assert_eq!(prices, vec![100, 200, 300]);
    }
}
