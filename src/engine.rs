//! Drives the pipeline: pulls records from the `Decoder`, routes by
//! stock-locate through the `Registry`, dispatches to the named `Book`
//! mutation, and requests a snapshot after each state-changing event. The
//! engine holds no order state itself — see spec.md §2 item 4, §4.4.

use std::io::Read;
use std::sync::Arc;

use log::warn;

use crate::book::Book;
use crate::decoder::{Decoder, RawEvent};
use crate::error::{DecodeError, ErrorTally};
use crate::registry::Registry;
use crate::sink::Sink;
use crate::stop::StopSignal;

/// Summary returned at clean end-of-stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub events_processed: u64,
    pub errors: ErrorTally,
}

pub struct Engine<R> {
    decoder: Decoder<R>,
    registry: Registry,
    stop: Arc<StopSignal>,
}

impl<R: Read> Engine<R> {
    pub fn new(decoder: Decoder<R>, registry: Registry, stop: Arc<StopSignal>) -> Self {
        Self {
            decoder,
            registry,
            stop,
        }
    }

    /// Runs to clean end-of-stream, to a fatal decode error, or until the
    /// stop signal is raised (checked between events; no partial event is
    /// committed). `Sink` calls are synchronous, so there is nothing left
    /// in flight when the loop breaks — the stop path returns directly.
    pub fn run(&mut self, sink: &mut impl Sink) -> Result<RunSummary, DecodeError> {
        self.run_with(sink, |_| {})
    }

    /// Like [`Engine::run`], but calls `on_progress(events_processed)` after
    /// every dispatched event so a caller can report progress without the
    /// engine knowing anything about how that's surfaced.
    pub fn run_with(
        &mut self,
        sink: &mut impl Sink,
        mut on_progress: impl FnMut(u64),
    ) -> Result<RunSummary, DecodeError> {
        let mut summary = RunSummary::default();

        loop {
            if self.stop.is_raised() {
                break;
            }
            match self.decoder.next_event()? {
                None => break,
                Some(raw) => {
                    self.dispatch(raw, sink, &mut summary.errors);
                    summary.events_processed += 1;
                    on_progress(summary.events_processed);
                }
            }
        }

        Ok(summary)
    }

    fn dispatch(&mut self, raw: RawEvent, sink: &mut impl Sink, errors: &mut ErrorTally) {
        if let RawEvent::StockDirectory { locate, symbol } = &raw {
            self.registry.on_stock_directory(*locate, symbol);
            return;
        }

        let locate = match raw.locate() {
            Some(l) => l,
            None => return, // RawEvent::Ignored
        };

        let Some(book) = self.registry.book_mut(locate) else {
            return; // locate not tracked: drop, per spec.md §4.4 step 1
        };

        match raw {
            RawEvent::AddOrder {
                ts,
                order_ref,
                side,
                shares,
                price,
                ..
            } => {
                let order = crate::types::Order {
                    order_ref,
                    side,
                    shares,
                    price,
                    ts,
                };
                if let Err(e) = book.add_order(order) {
                    warn!("{e}");
                    errors.record(e);
                }
                emit_snapshot(book, ts, sink);
            }
            RawEvent::Execute {
                ts,
                order_ref,
                executed_shares,
                ..
            } => {
                match book.execute(order_ref, ts, executed_shares, None, true) {
                    Ok(Some(trade)) => sink.on_trade(book.symbol(), &trade, false),
                    Ok(None) => {}
                    Err(e) => {
                        warn!("{e}");
                        errors.record(e);
                    }
                }
                emit_snapshot(book, ts, sink);
            }
            RawEvent::ExecuteWithPrice {
                ts,
                order_ref,
                executed_shares,
                printable,
                price,
                ..
            } => {
                match book.execute(order_ref, ts, executed_shares, Some(price), printable) {
                    Ok(Some(trade)) => sink.on_trade(book.symbol(), &trade, false),
                    Ok(None) => {}
                    Err(e) => {
                        warn!("{e}");
                        errors.record(e);
                    }
                }
                emit_snapshot(book, ts, sink);
            }
            RawEvent::Cancel {
                ts,
                order_ref,
                cancel_shares,
                ..
            } => {
                if let Err(e) = book.cancel(order_ref, cancel_shares) {
                    warn!("{e}");
                    errors.record(e);
                }
                emit_snapshot(book, ts, sink);
            }
            RawEvent::Delete { ts, order_ref, .. } => {
                if let Err(e) = book.delete(order_ref) {
                    warn!("{e}");
                    errors.record(e);
                }
                emit_snapshot(book, ts, sink);
            }
            RawEvent::Replace {
                ts,
                old_ref,
                new_ref,
                shares,
                price,
                ..
            } => {
                if let Err(e) = book.replace(old_ref, new_ref, shares, price, ts) {
                    warn!("{e}");
                    errors.record(e);
                }
                emit_snapshot(book, ts, sink);
            }
            RawEvent::Trade { ts, shares, price, .. } => {
                let trade = book.record_trade(ts, shares, price);
                sink.on_trade(book.symbol(), &trade, false);
            }
            RawEvent::CrossTrade { ts, shares, price, .. } => {
                let trade = book.record_cross_trade(ts, shares, price);
                sink.on_trade(book.symbol(), &trade, true);
            }
            RawEvent::StockDirectory { .. } | RawEvent::Ignored { .. } => unreachable!(),
        }
    }

}

fn emit_snapshot(book: &mut Book, ts: crate::types::Ts, sink: &mut impl Sink) {
    let row = book.snapshot(ts).clone();
    sink.on_snapshot(book.symbol(), &row);
}
