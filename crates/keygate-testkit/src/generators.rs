//! Proptest generators for property-based testing.

use proptest::prelude::*;

use keygate_core::SubjectId;

/// RFC 4648 base32 alphabet, the character set of token payloads and signatures.
pub const BASE32_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Generate a numeric subject id, like chat user ids.
pub fn subject_id() -> impl Strategy<Value = SubjectId> {
    "[1-9][0-9]{0,11}".prop_map(SubjectId::new)
}

/// Generate a requested validity, including out-of-range values.
pub fn valid_days() -> impl Strategy<Value = u32> {
    prop_oneof![0u32..=400, any::<u32>()]
}

/// Generate strings with the shape of a token (correct length, separators,
/// alphabet and a real date) but an arbitrary signature.
pub fn token_shaped() -> impl Strategy<Value = String> {
    (
        "[A-Z2-7]{16}",
        2000i32..2100,
        1u32..=12,
        1u32..=28,
        "[A-Z2-7]{16}",
    )
        .prop_map(|(payload, y, m, d, sig)| format!("{payload}-{y:04}{m:02}{d:02}-{sig}"))
}

/// Generate arbitrary user input of roughly token length.
pub fn arbitrary_input() -> impl Strategy<Value = String> {
    prop_oneof![
        ".{0,60}",
        "[A-Za-z0-9 -]{0,60}",
        "[A-Z2-7]{16}-[0-9]{8}-[A-Z2-7]{16}",
    ]
}

/// Replace the character at `index` (mod token length) with a different
/// base32 character, skipping separators.
pub fn tamper(token: &str, index: usize, pick: usize) -> String {
    let mut chars: Vec<char> = token.chars().collect();
    let positions: Vec<usize> = chars
        .iter()
        .enumerate()
        .filter(|(_, c)| **c != '-')
        .map(|(i, _)| i)
        .collect();
    if positions.is_empty() {
        return token.to_string();
    }

    let at = positions[index % positions.len()];
    let original = chars[at];
    let pool: Vec<char> = if original.is_ascii_digit() && is_date_position(at) {
        "0123456789".chars().filter(|c| *c != original).collect()
    } else {
        BASE32_ALPHABET.chars().filter(|c| *c != original).collect()
    };
    chars[at] = pool[pick % pool.len()];
    chars.into_iter().collect()
}

fn is_date_position(at: usize) -> bool {
    (17..25).contains(&at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tamper_changes_exactly_one_char() {
        let token = "AAAAAAAAAAAAAAAA-20270101-BBBBBBBBBBBBBBBB";
        for index in 0..token.len() {
            let tampered = tamper(token, index, index * 7);
            let diff = token
                .chars()
                .zip(tampered.chars())
                .filter(|(a, b)| a != b)
                .count();
            assert_eq!(diff, 1);
            assert_eq!(tampered.len(), token.len());
        }
    }

    proptest! {
        #[test]
        fn token_shaped_has_token_length(token in token_shaped()) {
            prop_assert_eq!(token.len(), 42);
        }
    }
}
