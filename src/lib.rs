//! Reconstructs a per-symbol limit order book from a NASDAQ TotalView-ITCH
//! 5.0 byte stream. See `SPEC_FULL.md` for the full design.

pub mod book;
pub mod csv_sink;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod registry;
pub mod sink;
pub mod stop;
pub mod types;

pub use book::Book;
pub use decoder::{Decoder, RawEvent, Transport};
pub use engine::{Engine, RunSummary};
pub use error::{BookError, DecodeError, ErrorTally};
pub use registry::Registry;
pub use sink::{NullSink, RecordingSink, Sink};
pub use stop::StopSignal;
pub use types::{LevelAgg, Locate, MatchNumber, Order, OrderRef, Price, Side, SnapshotRow, Ts, TradeRecord};
