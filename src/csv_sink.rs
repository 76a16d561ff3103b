//! `CsvSink`: a concrete `Sink` that writes snapshot and trade tables per
//! symbol, per spec.md §6. Genuinely peripheral to the core — this module
//! is the only place in the crate that touches a filesystem.
//!
//! `Sink`'s methods are infallible by design (the core never blocks on
//! sink I/O), so a write failure here is latched rather than propagated
//! inline; call `finish` once the run is over to surface it.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::sink::Sink;
use crate::types::{SnapshotRow, TradeRecord};

pub struct CsvSink {
    out_dir: PathBuf,
    depth: usize,
    snapshots: HashMap<String, csv::Writer<File>>,
    trades: HashMap<String, csv::Writer<File>>,
    cross_trades: HashMap<String, csv::Writer<File>>,
    error: Option<csv::Error>,
}

impl CsvSink {
    pub fn new(out_dir: impl Into<PathBuf>, depth: usize) -> anyhow::Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)?;
        Ok(Self {
            out_dir,
            depth,
            snapshots: HashMap::new(),
            trades: HashMap::new(),
            cross_trades: HashMap::new(),
            error: None,
        })
    }

    /// Flushes every open writer and surfaces the first write error
    /// encountered during the run, if any.
    pub fn finish(mut self) -> Result<(), csv::Error> {
        for w in self.snapshots.values_mut().chain(self.trades.values_mut()).chain(self.cross_trades.values_mut()) {
            if let Err(e) = w.flush() {
                self.error.get_or_insert_with(|| csv::Error::from(e));
            }
        }
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn open_snapshot_writer(&mut self, symbol: &str) -> csv::Result<csv::Writer<File>> {
        let path = file_path(&self.out_dir, symbol, "snapshots");
        let mut w = csv::Writer::from_path(&path)?;
        w.write_record(snapshot_header(self.depth))?;
        Ok(w)
    }

    fn open_trade_writer(&mut self, symbol: &str, cross: bool) -> csv::Result<csv::Writer<File>> {
        let suffix = if cross { "cross_trades" } else { "trades" };
        let path = file_path(&self.out_dir, symbol, suffix);
        let mut w = csv::Writer::from_path(&path)?;
        w.write_record(["timestamp", "shares", "price"])?;
        Ok(w)
    }

    fn record(&mut self, result: csv::Result<()>) {
        if let Err(e) = result {
            self.error.get_or_insert(e);
        }
    }
}

fn file_path(dir: &Path, symbol: &str, kind: &str) -> PathBuf {
    dir.join(format!("{symbol}.{kind}.csv"))
}

fn snapshot_header(depth: usize) -> Vec<String> {
    let mut header = vec!["timestamp".to_string()];
    for i in 1..=depth {
        header.push(format!("buy_price_{i}"));
        header.push(format!("buy_shares_{i}"));
        header.push(format!("sell_price_{i}"));
        header.push(format!("sell_shares_{i}"));
    }
    header
}

fn snapshot_record(row: &SnapshotRow) -> Vec<String> {
    let mut fields = vec![row.ts.0.to_string()];
    let depth = row.buy.len().max(row.sell.len());
    for i in 0..depth {
        match row.buy.get(i).copied().flatten() {
            Some(level) => {
                fields.push(level.price.to_string());
                fields.push(level.shares.to_string());
            }
            None => {
                fields.push(String::new());
                fields.push(String::new());
            }
        }
        match row.sell.get(i).copied().flatten() {
            Some(level) => {
                fields.push(level.price.to_string());
                fields.push(level.shares.to_string());
            }
            None => {
                fields.push(String::new());
                fields.push(String::new());
            }
        }
    }
    fields
}

impl Sink for CsvSink {
    fn on_snapshot(&mut self, symbol: &str, row: &SnapshotRow) {
        if self.error.is_some() {
            return;
        }
        if !self.snapshots.contains_key(symbol) {
            match self.open_snapshot_writer(symbol) {
                Ok(w) => {
                    self.snapshots.insert(symbol.to_string(), w);
                }
                Err(e) => {
                    self.error = Some(e);
                    return;
                }
            }
        }
        let record = snapshot_record(row);
        let w = self.snapshots.get_mut(symbol).unwrap();
        let result = w.write_record(&record);
        self.record(result);
    }

    fn on_trade(&mut self, symbol: &str, trade: &TradeRecord, cross: bool) {
        if self.error.is_some() {
            return;
        }
        let map = if cross { &mut self.cross_trades } else { &mut self.trades };
        if !map.contains_key(symbol) {
            match self.open_trade_writer(symbol, cross) {
                Ok(w) => {
                    let map = if cross { &mut self.cross_trades } else { &mut self.trades };
                    map.insert(symbol.to_string(), w);
                }
                Err(e) => {
                    self.error = Some(e);
                    return;
                }
            }
        }
        let map = if cross { &mut self.cross_trades } else { &mut self.trades };
        let w = map.get_mut(symbol).unwrap();
        let result = w.write_record([
            trade.ts.0.to_string(),
            trade.shares.to_string(),
            trade.price.to_string(),
        ]);
        self.record(result);
    }
}
