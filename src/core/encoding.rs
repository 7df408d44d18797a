//! Hex Classification and Byte-Order Helpers
//!
//! Concat operands in a proof are strings that are either hex-encoded bytes
//! or literal text. The classification rule lives here, in one place.

/// Does `s` look like hex-encoded bytes?
///
/// True when `s` has at least two characters, an even length, and only
/// `[0-9A-Fa-f]`. Literal strings that happen to satisfy this (for example
/// a calendar block id like `"1832"`) are treated as hex.
pub fn looks_like_hex(s: &str) -> bool {
    s.len() >= 2 && s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Interpret a concat operand as bytes.
///
/// Hex-looking strings decode to their bytes, everything else is taken as
/// the UTF-8 bytes of the literal.
pub fn operand_bytes(s: &str) -> Vec<u8> {
    if looks_like_hex(s) {
        if let Ok(bytes) = hex::decode(s) {
            return bytes;
        }
    }
    s.as_bytes().to_vec()
}

/// Hex of `bytes` with byte order reversed.
///
/// Bitcoin reports txids and merkle roots little-endian.
pub fn reversed_hex(bytes: &[u8]) -> String {
    let mut reversed = bytes.to_vec();
    reversed.reverse();
    hex::encode(reversed)
}

/// Reverse a hex string at byte (two character) granularity.
///
/// Returns `None` if the input is not valid hex.
pub fn reverse_hex_pairs(hex_str: &str) -> Option<String> {
    hex::decode(hex_str).ok().map(|bytes| reversed_hex(&bytes))
}

/// Hex encoding of a submitted hash: 20 to 64 bytes of hex.
pub fn is_hash_hex(s: &str) -> bool {
    looks_like_hex(s) && (40..=128).contains(&s.len())
}
