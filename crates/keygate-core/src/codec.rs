//! Key token codec: minting, shape checks and signature verification.
//!
//! A token has three dash-separated segments:
//!
//! ```text
//! PPPPPPPPPPPPPPPP-YYYYMMDD-SSSSSSSSSSSSSSSS
//! ```
//!
//! - `P`: 10 random bytes, base32 (16 chars)
//! - `YYYYMMDD`: the expiry date the key was minted with
//! - `S`: the first 10 bytes of `blake3::keyed_hash(secret, MAC_DOMAIN || P || '|' || YYYYMMDD)`, base32
//!
//! The expiry is covered by the MAC, so it cannot be extended without the
//! secret. Signature comparison is constant-time.

use std::fmt;

use chrono::{Days, NaiveDate};
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::base32;
use crate::error::{CoreError, Result};

/// Total token length in characters.
pub const TOKEN_LEN: usize = SEGMENT_LEN + 1 + DATE_LEN + 1 + SEGMENT_LEN;

/// Longest validity a key can be minted with.
pub const MAX_VALID_DAYS: u32 = 365;

/// Domain separator for the key MAC.
pub const MAC_DOMAIN: &[u8] = b"keygate/key-mac/v1";

const PAYLOAD_BYTES: usize = 10;
const MAC_BYTES: usize = 10;
const SEGMENT_LEN: usize = 16;
const DATE_LEN: usize = 8;
const DATE_FORMAT: &str = "%Y%m%d";
const SEPARATOR: u8 = b'-';

/// The 32-byte secret used to sign keys.
///
/// Process-wide and read-only once loaded. `Debug` never prints the bytes.
#[derive(Clone)]
pub struct ServerSecret([u8; 32]);

impl ServerSecret {
    /// Generate a fresh random secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| CoreError::SecretUnavailable(format!("invalid hex: {e}")))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            CoreError::SecretUnavailable(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ServerSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServerSecret(..)")
    }
}

/// A freshly minted key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    /// The bearer token handed to the administrator.
    pub token: String,
    /// First day on which the key is no longer redeemable.
    pub expires_on: NaiveDate,
}

/// Borrowed view of the three token segments.
#[derive(Debug, Clone, Copy)]
struct TokenParts<'a> {
    payload: &'a str,
    expiry: &'a str,
    signature: &'a str,
}

impl<'a> TokenParts<'a> {
    /// Split a token by position. Does not validate the segment contents.
    fn split(token: &'a str) -> Option<Self> {
        let bytes = token.as_bytes();
        if bytes.len() != TOKEN_LEN {
            return None;
        }
        let first = SEGMENT_LEN;
        let second = SEGMENT_LEN + 1 + DATE_LEN;
        if bytes[first] != SEPARATOR || bytes[second] != SEPARATOR {
            return None;
        }
        // Both separators are ASCII, so these are char boundaries.
        Some(Self {
            payload: token.get(..first)?,
            expiry: token.get(first + 1..second)?,
            signature: token.get(second + 1..)?,
        })
    }
}

/// Mints and verifies key tokens with a server secret.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    secret: ServerSecret,
}

impl KeyCodec {
    /// Create a codec around a loaded secret.
    pub fn new(secret: ServerSecret) -> Self {
        Self { secret }
    }

    /// Mint a new key valid for `valid_days` from `today`.
    ///
    /// `valid_days` is clamped to `1..=MAX_VALID_DAYS`.
    pub fn issue(&self, valid_days: u32, today: NaiveDate) -> Key {
        let days = valid_days.clamp(1, MAX_VALID_DAYS);
        let expires_on = today
            .checked_add_days(Days::new(days as u64))
            .unwrap_or(NaiveDate::MAX);

        let mut payload_bytes = [0u8; PAYLOAD_BYTES];
        rand::thread_rng().fill_bytes(&mut payload_bytes);
        let payload = base32::encode(&payload_bytes);
        let expiry = expires_on.format(DATE_FORMAT).to_string();
        let mac = self.mac(&payload, &expiry);

        Key {
            token: format!("{payload}-{expiry}-{}", base32::encode(&mac)),
            expires_on,
        }
    }

    /// Check the token shape without touching the secret.
    ///
    /// Length, separators, alphabet of the payload and signature segments,
    /// and that the embedded expiry is a real calendar date.
    pub fn check_format(token: &str) -> bool {
        let Some(parts) = TokenParts::split(token) else {
            return false;
        };

        parts.payload.bytes().all(base32::is_alphabet)
            && parts.signature.bytes().all(base32::is_alphabet)
            && parts.expiry.bytes().all(|c| c.is_ascii_digit())
            && NaiveDate::parse_from_str(parts.expiry, DATE_FORMAT).is_ok()
    }

    /// Recompute the MAC from payload and embedded expiry and compare it
    /// to the signature segment in constant time.
    pub fn check_signature(&self, token: &str) -> bool {
        let Some(parts) = TokenParts::split(token) else {
            return false;
        };
        let Some(supplied) = base32::decode(parts.signature) else {
            return false;
        };
        if supplied.len() != MAC_BYTES {
            return false;
        }

        let expected = self.mac(parts.payload, parts.expiry);
        expected[..].ct_eq(&supplied[..]).into()
    }

    /// The expiry date embedded in a well-formed token.
    pub fn embedded_expiry(token: &str) -> Result<NaiveDate> {
        let parts = TokenParts::split(token).ok_or(CoreError::MalformedToken)?;
        NaiveDate::parse_from_str(parts.expiry, DATE_FORMAT).map_err(|_| CoreError::MalformedToken)
    }

    /// A short, non-secret prefix of a token for logs and audit details.
    pub fn hint(token: &str) -> String {
        let prefix: String = token.chars().take(6).collect();
        if token.chars().count() > 6 {
            format!("{prefix}...")
        } else {
            prefix
        }
    }

    fn mac(&self, payload: &str, expiry: &str) -> [u8; MAC_BYTES] {
        let mut hasher = blake3::Hasher::new_keyed(&self.secret.0);
        hasher.update(MAC_DOMAIN);
        hasher.update(payload.as_bytes());
        hasher.update(b"|");
        hasher.update(expiry.as_bytes());
        let hash = hasher.finalize();

        let mut out = [0u8; MAC_BYTES];
        out.copy_from_slice(&hash.as_bytes()[..MAC_BYTES]);
        out
    }
}
