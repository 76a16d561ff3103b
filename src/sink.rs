//! The `Sink` trait is the core's only outward-facing dependency: a
//! component that receives per-symbol snapshot and trade records however it
//! likes. The core never touches a filesystem or a CSV writer directly —
//! see spec.md §1's "a sink component writes them however it likes."

use crate::types::{SnapshotRow, TradeRecord};

pub trait Sink {
    fn on_snapshot(&mut self, symbol: &str, row: &SnapshotRow);
    fn on_trade(&mut self, symbol: &str, trade: &TradeRecord, cross: bool);
}

/// Discards everything; useful for benchmarking the engine/book without any
/// I/O, and in tests that only care about book state.
#[derive(Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn on_snapshot(&mut self, _symbol: &str, _row: &SnapshotRow) {}
    fn on_trade(&mut self, _symbol: &str, _trade: &TradeRecord, _cross: bool) {}
}

/// Records everything in memory, in arrival order. Used by the integration
/// tests to assert on the exact sequence the engine produced.
#[derive(Default)]
pub struct RecordingSink {
    pub snapshots: Vec<(String, SnapshotRow)>,
    pub trades: Vec<(String, TradeRecord, bool)>,
}

impl Sink for RecordingSink {
    fn on_snapshot(&mut self, symbol: &str, row: &SnapshotRow) {
        self.snapshots.push((symbol.to_string(), row.clone()));
    }
    fn on_trade(&mut self, symbol: &str, trade: &TradeRecord, cross: bool) {
        self.trades.push((symbol.to_string(), *trade, cross));
    }
}
