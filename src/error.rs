//! Error kinds for the decoder and the book, per the error handling design.

use crate::types::OrderRef;

/// Fatal decode-time errors. Either one aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated stream at byte offset {offset}")]
    TruncatedStream { offset: u64 },

    #[error("malformed record: unknown tag {tag:#04x} ({tag}) at byte offset {offset}")]
    MalformedRecord { tag: u8, offset: u64 },

    #[error("I/O error at byte offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: std::io::Error,
    },
}

impl DecodeError {
    /// Byte offset of the record that triggered the error, for diagnostics.
    pub fn offset(&self) -> u64 {
        match *self {
            DecodeError::TruncatedStream { offset } => offset,
            DecodeError::MalformedRecord { offset, .. } => offset,
            DecodeError::Io { offset, .. } => offset,
        }
    }
}

/// Non-fatal book mutation errors. The book has already applied the
/// documented fallback (see each variant) by the time this is returned;
/// these exist so the caller can count and log a warning.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum BookError {
    /// Event referenced an order the book has never seen. No mutation was
    /// applied; the event was dropped.
    #[error("unknown order reference {0:?}")]
    UnknownRef(OrderRef),

    /// Two Adds named the same reference. The prior order was evicted and
    /// replaced by the new one.
    #[error("duplicate order reference {0:?}, prior order replaced")]
    DuplicateRef(OrderRef),

    /// A Cancel requested more shares than were resting. The order was
    /// removed outright instead of driven negative.
    #[error("cancel of {requested} shares exceeds {resting} resting for {order_ref:?}")]
    InvalidShares {
        order_ref: OrderRef,
        requested: u32,
        resting: u32,
    },
}

/// Running counts of non-fatal errors, reported at end-of-run.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorTally {
    pub unknown_ref: u64,
    pub duplicate_ref: u64,
    pub invalid_shares: u64,
}

impl ErrorTally {
    pub fn record(&mut self, err: BookError) {
        match err {
            BookError::UnknownRef(_) => self.unknown_ref += 1,
            BookError::DuplicateRef(_) => self.duplicate_ref += 1,
            BookError::InvalidShares { .. } => self.invalid_shares += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.unknown_ref + self.duplicate_ref + self.invalid_shares
    }
}
