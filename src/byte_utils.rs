//! Lossless byte/hex conversion and the GPT-2 byte-to-unicode remapping.
//!
//! Rank maps in this crate are keyed directly by raw byte slices (`Vec<u8>`),
//! not by hex strings — per-lookup hex conversion is a JavaScript-specific
//! optimization a native byte-slice hash map makes unnecessary. The hex
//! helpers here exist for the handful of places that still need a string
//! view: the `<0xHH>` byte-fallback piece format and diagnostic logging.
//!
//! The GPT-2 `bytes_to_unicode` remapping is used exclusively by the
//! `open_clip` vocabulary loader (`vocab::load_open_clip`); tiktoken's own
//! encoder and decoder operate on raw bytes and never pass through it.

use std::collections::HashMap;
use std::sync::OnceLock;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Encodes a byte slice as lowercase hex, two characters per byte.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX_DIGITS[(b >> 4) as usize] as char);
        out.push(HEX_DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

/// Decodes a lowercase (or uppercase) hex string back into bytes.
pub fn bytes_from_hex(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.as_bytes();
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(hex.len() / 2);
    for pair in hex.chunks_exact(2) {
        let hi = hex_digit(pair[0])?;
        let lo = hex_digit(pair[1])?;
        out.push((hi << 4) | lo);
    }
    Some(out)
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Parses a `<0xHH>` byte-fallback piece, returning the single byte value.
pub fn parse_byte_fallback_piece(piece: &str) -> Option<u8> {
    let inner = piece.strip_prefix("<0x")?.strip_suffix('>')?;
    if inner.len() != 2 {
        return None;
    }
    let hi = hex_digit(inner.as_bytes()[0])?;
    let lo = hex_digit(inner.as_bytes()[1])?;
    Some((hi << 4) | lo)
}

/// Formats a byte as a `<0xHH>` byte-fallback piece, matching SentencePiece's
/// own convention (uppercase hex digits).
pub fn format_byte_fallback_piece(byte: u8) -> String {
    format!("<0x{byte:02X}>")
}

static BYTES_TO_UNICODE: OnceLock<HashMap<u8, char>> = OnceLock::new();
static UNICODE_TO_BYTES: OnceLock<HashMap<char, u8>> = OnceLock::new();

/// GPT-2's `bytes_to_unicode`: every "printable" byte maps to itself as a
/// code point; the remaining 68 bytes are remapped to synthetic code points
/// starting at 256, in enumeration order. This mapping lets every byte
/// round-trip through a printable, whitespace-free unicode string, which is
/// what the `open_clip` merge-rule file's text lines assume.
pub fn bytes_to_unicode() -> &'static HashMap<u8, char> {
    BYTES_TO_UNICODE.get_or_init(|| {
        let printable = printable_bytes();
        let mut map = HashMap::with_capacity(256);
        for &b in &printable {
            map.insert(b, b as char);
        }
        let mut next = 256u32;
        for b in 0u8..=255 {
            if !printable.contains(&b) {
                map.insert(b, char::from_u32(next).expect("valid codepoint"));
                next += 1;
            }
        }
        map
    })
}

/// Inverse of [`bytes_to_unicode`].
pub fn unicode_to_bytes() -> &'static HashMap<char, u8> {
    UNICODE_TO_BYTES.get_or_init(|| {
        bytes_to_unicode().iter().map(|(&b, &c)| (c, b)).collect()
    })
}

/// The "printable" byte ranges used by GPT-2/open_clip's byte remapping:
/// `[33,126] ∪ [161,172] ∪ [174,255]`, in ascending order. This is also the
/// order in which `rankToIntbyte` assigns the first 256 ranks when building
/// the `open_clip` seed vocabulary, so callers that need that exact
/// correspondence should rely on this function's ordering.
pub fn printable_bytes() -> Vec<u8> {
    let mut out = Vec::with_capacity(188);
    out.extend(33u8..=126);
    out.extend(161u8..=172);
    out.extend(174u8..=255);
    out
}
