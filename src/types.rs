//! Core data types: fixed-point price, order-reference newtypes, and the
//! resting `Order` record. Kept free of any I/O or allocation beyond what a
//! single order needs.

use std::fmt;

/// Fixed-point price: the raw ITCH integer, 4 implied decimal places.
/// All arithmetic and comparisons happen on the raw integer; conversion to
/// decimal happens only at the output boundary (`Display`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(pub u32);

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:04}", self.0 / 10_000, self.0 % 10_000)
    }
}

/// Nanoseconds since session midnight (wire field is 48 bits, widened to 64).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ts(pub u64);

/// Session-local order reference number. Unique while the order rests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderRef(pub u64);

/// ITCH match number, carried through execution/trade events for completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchNumber(pub u64);

/// Stock-locate identifier issued by the Stock Directory message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Locate(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

/// A resting order. Invariant: `shares > 0` whenever it is reachable from a
/// `Book`'s side or index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub order_ref: OrderRef,
    pub side: Side,
    pub shares: u32,
    pub price: Price,
    pub ts: Ts,
}

/// A single print: timestamp, shares, price. Used for both the trade log
/// and the cross-trade log (same shape, different logs — see DESIGN.md).
/// `shares` is `u64` because a Cross Trade's wire `Shares` field is a
/// genuine 8-byte quantity (an auction cross can exceed `u32::MAX`
/// shares); ordinary trade prints fit comfortably in the same field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeRecord {
    pub ts: Ts,
    pub shares: u64,
    pub price: Price,
}

/// One price level on one side of a snapshot row: the aggregate of all
/// resting shares at that price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelAgg {
    pub price: Price,
    pub shares: u32,
}

/// One snapshot row: up to `depth` levels per side, missing levels absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotRow {
    pub ts: Ts,
    pub buy: Vec<Option<LevelAgg>>,
    pub sell: Vec<Option<LevelAgg>>,
}

/// Right-trim an 8-byte ASCII field to a `String`, per spec.md §4.1.
pub fn trim_symbol(raw: &[u8; 8]) -> String {
    let end = raw.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
