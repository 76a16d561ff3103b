//! Byte-level ITCH record builders shared by the integration tests. Mirrors
//! the field layout `itch_orderbook::decoder` expects, per spec.md §4.1.
//! Not every builder is used by every test binary that includes this
//! module, since `mod common;` is compiled fresh per integration test file.
#![allow(dead_code)]

pub fn header(out: &mut Vec<u8>, locate: u16, ts: u64) {
    out.extend_from_slice(&locate.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&ts.to_be_bytes()[2..8]);
}

pub fn symbol8(sym: &str) -> [u8; 8] {
    let mut out = [b' '; 8];
    out[..sym.len()].copy_from_slice(sym.as_bytes());
    out
}

pub fn stock_directory(locate: u16, ts: u64, symbol: &str) -> Vec<u8> {
    let mut b = vec![b'R'];
    header(&mut b, locate, ts);
    b.extend_from_slice(&symbol8(symbol));
    b.resize(1 + 38, 0);
    b
}

pub fn add_order(locate: u16, ts: u64, order_ref: u64, side: u8, shares: u32, price: u32) -> Vec<u8> {
    let mut b = vec![b'A'];
    header(&mut b, locate, ts);
    b.extend_from_slice(&order_ref.to_be_bytes());
    b.push(side);
    b.extend_from_slice(&shares.to_be_bytes());
    b.extend_from_slice(&symbol8("TEST"));
    b.extend_from_slice(&price.to_be_bytes());
    b
}

pub fn execute(locate: u16, ts: u64, order_ref: u64, executed_shares: u32, match_number: u64) -> Vec<u8> {
    let mut b = vec![b'E'];
    header(&mut b, locate, ts);
    b.extend_from_slice(&order_ref.to_be_bytes());
    b.extend_from_slice(&executed_shares.to_be_bytes());
    b.extend_from_slice(&match_number.to_be_bytes());
    b
}

pub fn replace(locate: u16, ts: u64, old_ref: u64, new_ref: u64, shares: u32, price: u32) -> Vec<u8> {
    let mut b = vec![b'U'];
    header(&mut b, locate, ts);
    b.extend_from_slice(&old_ref.to_be_bytes());
    b.extend_from_slice(&new_ref.to_be_bytes());
    b.extend_from_slice(&shares.to_be_bytes());
    b.extend_from_slice(&price.to_be_bytes());
    b
}

pub fn execute_with_price(
    locate: u16,
    ts: u64,
    order_ref: u64,
    executed_shares: u32,
    match_number: u64,
    printable: bool,
    price: u32,
) -> Vec<u8> {
    let mut b = vec![b'C'];
    header(&mut b, locate, ts);
    b.extend_from_slice(&order_ref.to_be_bytes());
    b.extend_from_slice(&executed_shares.to_be_bytes());
    b.extend_from_slice(&match_number.to_be_bytes());
    b.push(if printable { b'Y' } else { b'N' });
    b.extend_from_slice(&price.to_be_bytes());
    b
}

pub fn cancel(locate: u16, ts: u64, order_ref: u64, cancel_shares: u32) -> Vec<u8> {
    let mut b = vec![b'X'];
    header(&mut b, locate, ts);
    b.extend_from_slice(&order_ref.to_be_bytes());
    b.extend_from_slice(&cancel_shares.to_be_bytes());
    b
}

pub fn delete(locate: u16, ts: u64, order_ref: u64) -> Vec<u8> {
    let mut b = vec![b'D'];
    header(&mut b, locate, ts);
    b.extend_from_slice(&order_ref.to_be_bytes());
    b
}

pub fn trade(locate: u16, ts: u64, shares: u32, price: u32) -> Vec<u8> {
    let mut b = vec![b'P'];
    header(&mut b, locate, ts);
    b.extend_from_slice(&0u64.to_be_bytes());
    b.push(b'B');
    b.extend_from_slice(&shares.to_be_bytes());
    b.extend_from_slice(&symbol8("TEST"));
    b.extend_from_slice(&price.to_be_bytes());
    b.extend_from_slice(&0u64.to_be_bytes());
    b
}

pub fn cross_trade(locate: u16, ts: u64, shares: u64, price: u32) -> Vec<u8> {
    let mut b = vec![b'Q'];
    header(&mut b, locate, ts);
    b.extend_from_slice(&shares.to_be_bytes());
    b.extend_from_slice(&symbol8("TEST"));
    b.extend_from_slice(&price.to_be_bytes());
    b.extend_from_slice(&0u64.to_be_bytes()); // match number, unused
    b.push(b'O'); // cross type, unused
    b
}
