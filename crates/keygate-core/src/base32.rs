//! RFC 4648 base32 (upper case, no padding).
//!
//! Tokens are read back from user input after upper-casing, so the
//! alphabet is the canonical upper-case one and decoding is strict.

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Encode bytes as unpadded upper-case base32.
pub fn encode(data: &[u8]) -> String {
    let mut result = String::with_capacity((data.len() * 8 + 4) / 5);
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for &byte in data {
        buffer = (buffer << 8) | (byte as u64);
        bits_in_buffer += 8;

        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            let index = ((buffer >> bits_in_buffer) & 0x1f) as usize;
            result.push(ALPHABET[index] as char);
        }
    }

    if bits_in_buffer > 0 {
        let index = ((buffer << (5 - bits_in_buffer)) & 0x1f) as usize;
        result.push(ALPHABET[index] as char);
    }

    result
}

/// Decode unpadded upper-case base32.
///
/// Returns `None` on any character outside the alphabet or when the
/// trailing bits are not zero (non-canonical encoding).
pub fn decode(s: &str) -> Option<Vec<u8>> {
    let mut result = Vec::with_capacity(s.len() * 5 / 8);
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for c in s.bytes() {
        buffer = (buffer << 5) | (value_of(c)? as u64);
        bits_in_buffer += 5;

        if bits_in_buffer >= 8 {
            bits_in_buffer -= 8;
            result.push(((buffer >> bits_in_buffer) & 0xff) as u8);
        }
    }

    if buffer & ((1 << bits_in_buffer) - 1) != 0 {
        return None;
    }

    Some(result)
}

/// Check whether a byte belongs to the alphabet.
pub fn is_alphabet(c: u8) -> bool {
    value_of(c).is_some()
}

fn value_of(c: u8) -> Option<u8> {
    match c {
        b'A'..=b'Z' => Some(c - b'A'),
        b'2'..=b'7' => Some(c - b'2' + 26),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_rfc4648_vectors() {
        assert_eq!(encode(b""), "");
        assert_eq!(encode(b"f"), "MY");
        assert_eq!(encode(b"fo"), "MZXQ");
        assert_eq!(encode(b"foo"), "MZXW6");
        assert_eq!(encode(b"foob"), "MZXW6YQ");
        assert_eq!(encode(b"fooba"), "MZXW6YTB");
        assert_eq!(encode(b"foobar"), "MZXW6YTBOI");
    }

    #[test]
    fn test_decode_rfc4648_vectors() {
        assert_eq!(decode("MZXW6YTBOI").unwrap(), b"foobar");
        assert_eq!(decode("MZXW6").unwrap(), b"foo");
        assert_eq!(decode("").unwrap(), b"");
    }

    #[test]
    fn test_decode_rejects_lowercase_and_padding() {
        assert!(decode("mzxw6").is_none());
        assert!(decode("MZXW6===").is_none());
        assert!(decode("MZXW1").is_none());
    }

    #[test]
    fn test_decode_rejects_noncanonical_trailing_bits() {
        // "MZ" would decode to 'f' only if the last 2 bits were zero.
        assert!(decode("MZ").is_none());
        assert_eq!(decode("MY").unwrap(), b"f");
    }

    #[test]
    fn test_ten_bytes_is_sixteen_chars() {
        assert_eq!(encode(&[0xffu8; 10]).len(), 16);
        assert_eq!(decode(&encode(&[0x5au8; 10])).unwrap(), vec![0x5au8; 10]);
    }
}
