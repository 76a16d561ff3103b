//! Framed decoding of a NASDAQ TotalView-ITCH 5.0 byte stream into a typed
//! sequence of events. Pure and allocation-light: the only state carried
//! across calls is the transport mode and the current byte offset; the
//! per-record scratch buffer is reused.

use std::io::Read;

use crate::error::DecodeError;
use crate::types::{trim_symbol, Locate, MatchNumber, OrderRef, Price, Side, Ts};

/// Largest payload in the tag table (message `I`, NOII, 49 bytes).
const MAX_PAYLOAD: usize = 49;

/// How records are framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// `[1-byte tag][payload]`, payload length implied by the tag. The
    /// default: matches an ITCH 5.0 file as distributed by NASDAQ.
    Unframed,
    /// `[2-byte big-endian length][1-byte tag][payload]`, where `length`
    /// must equal `1 + payload.len()`. Matches feeds that wrap ITCH records
    /// in a session transport.
    LengthPrefixed,
}

/// One decoded record. Only the fields the book cares about downstream are
/// kept; attribution (MPID), tracking numbers, and other decoded-but-unused
/// fields are dropped at this boundary per spec.md §4.1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    StockDirectory {
        locate: Locate,
        symbol: String,
    },
    AddOrder {
        locate: Locate,
        ts: Ts,
        order_ref: OrderRef,
        side: Side,
        shares: u32,
        price: Price,
    },
    Execute {
        locate: Locate,
        ts: Ts,
        order_ref: OrderRef,
        executed_shares: u32,
        match_number: MatchNumber,
    },
    ExecuteWithPrice {
        locate: Locate,
        ts: Ts,
        order_ref: OrderRef,
        executed_shares: u32,
        match_number: MatchNumber,
        printable: bool,
        price: Price,
    },
    Cancel {
        locate: Locate,
        ts: Ts,
        order_ref: OrderRef,
        cancel_shares: u32,
    },
    Delete {
        locate: Locate,
        ts: Ts,
        order_ref: OrderRef,
    },
    Replace {
        locate: Locate,
        ts: Ts,
        old_ref: OrderRef,
        new_ref: OrderRef,
        shares: u32,
        price: Price,
    },
    Trade {
        locate: Locate,
        ts: Ts,
        shares: u32,
        price: Price,
    },
    CrossTrade {
        locate: Locate,
        ts: Ts,
        shares: u64,
        price: Price,
    },
    /// One of the twelve administrative tags (`S H Y L V W K J h B I`),
    /// decoded-by-skipping so framing stays self-synchronizing.
    Ignored { tag: u8 },
}

impl RawEvent {
    /// The stock-locate this record is routed by, if any. `Ignored` carries
    /// no locate since it is dropped before routing.
    pub fn locate(&self) -> Option<Locate> {
        match *self {
            RawEvent::StockDirectory { locate, .. }
            | RawEvent::AddOrder { locate, .. }
            | RawEvent::Execute { locate, .. }
            | RawEvent::ExecuteWithPrice { locate, .. }
            | RawEvent::Cancel { locate, .. }
            | RawEvent::Delete { locate, .. }
            | RawEvent::Replace { locate, .. }
            | RawEvent::Trade { locate, .. }
            | RawEvent::CrossTrade { locate, .. } => Some(locate),
            RawEvent::Ignored { .. } => None,
        }
    }
}

/// Payload length (bytes after the 1-byte tag), per spec.md §4.1's table.
/// `None` means the tag is unknown — fatal, per spec.md.
fn payload_len(tag: u8) -> Option<usize> {
    Some(match tag {
        b'S' => 11,
        b'R' => 38,
        b'H' => 24,
        b'Y' => 19,
        b'L' => 25,
        b'V' => 34,
        b'W' => 11,
        b'K' => 27,
        b'J' => 34,
        b'h' => 20,
        b'A' => 35,
        b'F' => 39,
        b'E' => 30,
        b'C' => 35,
        b'X' => 22,
        b'D' => 18,
        b'U' => 34,
        b'P' => 43,
        b'Q' => 39,
        b'B' => 18,
        b'I' => 49,
        _ => return None,
    })
}

const IGNORED_TAGS: &[u8] = b"SHYLVWKJhBI";

#[inline]
fn read_u16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}
#[inline]
fn read_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}
#[inline]
fn read_u64(b: &[u8]) -> u64 {
    u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}
#[inline]
fn read_u48(b: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[2..8].copy_from_slice(&b[0..6]);
    u64::from_be_bytes(buf)
}
#[inline]
fn read_fixed8(b: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&b[0..8]);
    out
}

/// Reads from `r` until `buf` is full or end-of-stream; returns the number
/// of bytes actually read so the caller can tell a clean EOF at a record
/// boundary apart from one mid-record.
fn read_partial<R: Read>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match r.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Decodes a single byte stream into a sequence of `RawEvent`s.
pub struct Decoder<R> {
    reader: R,
    transport: Transport,
    offset: u64,
    buf: [u8; MAX_PAYLOAD],
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R, transport: Transport) -> Self {
        Self {
            reader,
            transport,
            offset: 0,
            buf: [0u8; MAX_PAYLOAD],
        }
    }

    /// Byte offset of the last record returned (or about to be returned on
    /// error), for diagnostics.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Decodes and returns the next record, or `Ok(None)` at a clean
    /// end-of-stream (EOF exactly at a record boundary).
    pub fn next_event(&mut self) -> Result<Option<RawEvent>, DecodeError> {
        let offset = self.offset;
        let mut prefix = [0u8; 2];
        let prefixed = self.transport == Transport::LengthPrefixed;

        if prefixed {
            let n = read_partial(&mut self.reader, &mut prefix)
                .map_err(|source| DecodeError::Io { offset, source })?;
            if n == 0 {
                return Ok(None);
            }
            if n < 2 {
                return Err(DecodeError::TruncatedStream { offset });
            }
        }

        let mut tag_buf = [0u8; 1];
        let n = read_partial(&mut self.reader, &mut tag_buf)
            .map_err(|source| DecodeError::Io { offset, source })?;
        if n == 0 {
            return if prefixed {
                Err(DecodeError::TruncatedStream { offset })
            } else {
                Ok(None)
            };
        }
        let tag = tag_buf[0];

        let len = payload_len(tag).ok_or(DecodeError::MalformedRecord { tag, offset })?;

        if prefixed {
            let declared = u16::from_be_bytes(prefix) as usize;
            if declared != 1 + len {
                return Err(DecodeError::MalformedRecord { tag, offset });
            }
        }

        let body = &mut self.buf[..len];
        let n = read_partial(&mut self.reader, body)
            .map_err(|source| DecodeError::Io { offset, source })?;
        if n < len {
            return Err(DecodeError::TruncatedStream { offset });
        }

        self.offset += (if prefixed { 2 } else { 0 } + 1 + len) as u64;

        Ok(Some(decode_body(tag, &self.buf[..len])))
    }
}

/// Decodes a record body whose length has already been validated against
/// the tag table; this never fails.
fn decode_body(tag: u8, b: &[u8]) -> RawEvent {
    if IGNORED_TAGS.contains(&tag) {
        return RawEvent::Ignored { tag };
    }

    let locate = Locate(read_u16(&b[0..2]));
    // tracking number (b[2..4]) is decoded for completeness and never used.
    let ts = Ts(read_u48(&b[4..10]));

    match tag {
        b'R' => RawEvent::StockDirectory {
            locate,
            symbol: trim_symbol(&read_fixed8(&b[10..18])),
        },
        b'A' | b'F' => {
            let order_ref = OrderRef(read_u64(&b[10..18]));
            let side = if b[18] == b'B' { Side::Buy } else { Side::Sell };
            let shares = read_u32(&b[19..23]);
            let price = Price(read_u32(&b[31..35]));
            RawEvent::AddOrder {
                locate,
                ts,
                order_ref,
                side,
                shares,
                price,
            }
        }
        b'E' => RawEvent::Execute {
            locate,
            ts,
            order_ref: OrderRef(read_u64(&b[10..18])),
            executed_shares: read_u32(&b[18..22]),
            match_number: MatchNumber(read_u64(&b[22..30])),
        },
        b'C' => RawEvent::ExecuteWithPrice {
            locate,
            ts,
            order_ref: OrderRef(read_u64(&b[10..18])),
            executed_shares: read_u32(&b[18..22]),
            match_number: MatchNumber(read_u64(&b[22..30])),
            printable: b[30] == b'Y',
            price: Price(read_u32(&b[31..35])),
        },
        b'X' => RawEvent::Cancel {
            locate,
            ts,
            order_ref: OrderRef(read_u64(&b[10..18])),
            cancel_shares: read_u32(&b[18..22]),
        },
        b'D' => RawEvent::Delete {
            locate,
            ts,
            order_ref: OrderRef(read_u64(&b[10..18])),
        },
        b'U' => RawEvent::Replace {
            locate,
            ts,
            old_ref: OrderRef(read_u64(&b[10..18])),
            new_ref: OrderRef(read_u64(&b[18..26])),
            shares: read_u32(&b[26..30]),
            price: Price(read_u32(&b[30..34])),
        },
        b'P' => RawEvent::Trade {
            locate,
            ts,
            // ref(8) side(1) precede shares; skip to shares at b[19..23]
            shares: read_u32(&b[19..23]),
            price: Price(read_u32(&b[31..35])),
        },
        b'Q' => RawEvent::CrossTrade {
            locate,
            ts,
            // Cross trade shares is a genuine 8-byte field (a cross print
            // can carry an entire auction's volume), unlike the 4-byte
            // shares/executed_shares/cancel_shares fields elsewhere.
            shares: read_u64(&b[10..18]),
            price: Price(read_u32(&b[26..30])),
        },
        _ => unreachable!("tag {} is neither ignored nor handled", tag as char),
    }
}
