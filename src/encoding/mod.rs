//! Hex codec for control-card operands.
//!
//! Offsets are lenient: anything that is not a hex number becomes 0.
//! Payloads are strict: an odd digit count, a non-hex digit or an oversized
//! payload is an error the caller must treat as fatal.

use thiserror::Error;

/// カード1枚で扱えるデータの最大バイト数
pub const MAX_PAYLOAD: usize = 2045;

/// データのデコードエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HexError {
    #[error("'data' must be pairs of hex bytes; srclen is {0}")]
    OddLength(usize),

    #[error("invalid hex digit {digit:?} at position {position}")]
    InvalidDigit { digit: char, position: usize },

    #[error("'data' is {0} bytes; at most {max} bytes fit on one card", max = MAX_PAYLOAD)]
    TooLong(usize),
}

/// `0x`/`0X` プレフィックスを取り除く
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// オフセット・長さ・スキップ数を16進数として解析
/// `u64` に収まる16進数でなければ `None`
pub fn try_parse_offset(s: &str) -> Option<u64> {
    let digits = strip_hex_prefix(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// オフセットを解析。不正な場合は0
pub fn parse_offset(s: &str) -> u64 {
    try_parse_offset(s).unwrap_or(0)
}

/// 16進数のペアをバイト列にデコード
pub fn parse_payload(s: &str) -> Result<Vec<u8>, HexError> {
    let digits = strip_hex_prefix(s);

    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }
    if digits.len() / 2 > MAX_PAYLOAD {
        return Err(HexError::TooLong(digits.len() / 2));
    }

    let raw = digits.as_bytes();
    let mut out = Vec::with_capacity(raw.len() / 2);
    for (i, pair) in raw.chunks_exact(2).enumerate() {
        let hi = nibble(pair[0], i * 2)?;
        let lo = nibble(pair[1], i * 2 + 1)?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

/// バイト列を小文字の16進数文字列に変換
pub fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn nibble(c: u8, position: usize) -> Result<u8, HexError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(HexError::InvalidDigit {
            digit: c as char,
            position,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn offset_accepts_both_prefixes() {
        assert_eq!(parse_offset("1c2"), 0x1c2);
        assert_eq!(parse_offset("0x1C2"), 0x1c2);
        assert_eq!(parse_offset("0X1c2"), 0x1c2);
        assert_eq!(parse_offset("ffffffffffffffff"), u64::MAX);
    }

    #[test]
    fn malformed_offset_becomes_zero() {
        assert_eq!(parse_offset("zz"), 0);
        assert_eq!(parse_offset("0x"), 0);
        assert_eq!(parse_offset(""), 0);
        assert_eq!(parse_offset("+10"), 0);
        // 17桁は u64 に収まらない
        assert_eq!(parse_offset("10000000000000000"), 0);
        assert_eq!(try_parse_offset("12g"), None);
    }

    #[test]
    fn payload_decodes_pairs() {
        assert_eq!(parse_payload("aabbccdd").unwrap(), vec![0xaa, 0xbb, 0xcc, 0xdd]);
        assert_eq!(parse_payload("0x07").unwrap(), vec![0x07]);
        assert_eq!(parse_payload("0X0C").unwrap(), vec![0x0c]);
        assert!(parse_payload("").unwrap().is_empty());
        assert!(parse_payload("0x").unwrap().is_empty());
    }

    #[test]
    fn payload_rejects_odd_length() {
        assert_eq!(parse_payload("abc"), Err(HexError::OddLength(3)));
        assert_eq!(parse_payload("0x1"), Err(HexError::OddLength(1)));
    }

    #[test]
    fn payload_rejects_bad_digit() {
        assert_eq!(
            parse_payload("a0zz"),
            Err(HexError::InvalidDigit {
                digit: 'z',
                position: 2
            })
        );
    }

    #[test]
    fn payload_size_is_capped() {
        let max = "00".repeat(MAX_PAYLOAD);
        assert_eq!(parse_payload(&max).unwrap().len(), MAX_PAYLOAD);

        let over = "00".repeat(MAX_PAYLOAD + 1);
        assert_eq!(parse_payload(&over), Err(HexError::TooLong(MAX_PAYLOAD + 1)));
    }

    proptest! {
        #[test]
        fn payload_round_trips(s in "([0-9a-fA-F]{2}){0,64}") {
            let bytes = parse_payload(&s).unwrap();
            prop_assert_eq!(bytes.len(), s.len() / 2);
            prop_assert_eq!(encode_hex(&bytes), s.to_ascii_lowercase());
        }

        #[test]
        fn odd_payload_always_fails(s in "[0-9a-fA-F]([0-9a-fA-F]{2}){0,32}") {
            prop_assert_eq!(parse_payload(&s), Err(HexError::OddLength(s.len())));
        }

        #[test]
        fn offset_matches_std_parse(n in any::<u64>()) {
            prop_assert_eq!(parse_offset(&format!("{:x}", n)), n);
            prop_assert_eq!(parse_offset(&format!("0x{:X}", n)), n);
        }
    }
}
