// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The short identifier alphabet, validation, and minting.

use std::time::{Duration, SystemTime};

use tick::Clock;
use xxhash_rust::xxh3::xxh3_128;

/// Length of every short identifier.
pub const ID_LEN: usize = 6;

/// The 62 characters identifiers are drawn from, in digit order.
pub const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

const VALID: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = true;
        i += 1;
    }
    table
};

/// Why a string is not a valid short identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidId {
    /// The identifier does not have exactly [`ID_LEN`] characters.
    #[error("identifier must be 6 characters long, got {0}")]
    Length(usize),
    /// The identifier contains a character outside of [`ALPHABET`].
    #[error("identifier contains invalid character {character:?} at position {position}")]
    Character {
        /// The offending character.
        character: char,
        /// Its character position within the identifier.
        position: usize,
    },
}

/// Checks that `id` has exactly six characters, all from `A-Z`, `a-z`, or `0-9`.
///
/// # Errors
///
/// Returns the first reason the identifier is invalid.
///
/// # Examples
///
/// ```
/// use linkcache_ids::{InvalidId, validate};
///
/// assert!(validate("aZ09bY").is_ok());
/// assert_eq!(validate("abc"), Err(InvalidId::Length(3)));
/// assert!(matches!(validate("abc!12"), Err(InvalidId::Character { character: '!', position: 3 })));
/// ```
pub fn validate(id: &str) -> Result<(), InvalidId> {
    let len = id.chars().count();
    if len != ID_LEN {
        return Err(InvalidId::Length(len));
    }

    match id.chars().enumerate().find(|(_, c)| !is_id_char(*c)) {
        Some((position, character)) => Err(InvalidId::Character { character, position }),
        None => Ok(()),
    }
}

fn is_id_char(c: char) -> bool {
    u8::try_from(c).is_ok_and(|b| VALID[usize::from(b)])
}

/// Mints a fresh identifier for `url`.
///
/// The identifier is derived from a 128-bit hash of the URL and the current time in
/// nanoseconds, written in base 62. Collisions are possible; the store's uniqueness check
/// on create is what detects them.
#[must_use]
pub fn mint(url: &str, clock: &Clock) -> String {
    let nanos = clock
        .system_time()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos();

    let mut input = Vec::with_capacity(url.len() + 16);
    input.extend_from_slice(url.as_bytes());
    input.extend_from_slice(&nanos.to_le_bytes());

    encode(xxh3_128(&input))
}

#[expect(clippy::cast_possible_truncation, reason = "the remainder is always below 62")]
fn encode(mut value: u128) -> String {
    const BASE: u128 = 62;
    let mut out = [0_u8; ID_LEN];

    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(value % BASE) as usize];
        value /= BASE;
    }

    out.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use tick::ClockControl;

    use super::*;

    #[test]
    fn accepts_exactly_six_alphabet_characters() {
        for id in ["AAAAAA", "zzzzzz", "000000", "aB3dE9", "Zy9xW8"] {
            assert_eq!(validate(id), Ok(()), "{id}");
        }
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert_eq!(validate(""), Err(InvalidId::Length(0)));
        assert_eq!(validate("abcde"), Err(InvalidId::Length(5)));
        assert_eq!(validate("abcdefg"), Err(InvalidId::Length(7)));
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        assert!(matches!(
            validate("abc!ef"),
            Err(InvalidId::Character { character: '!', position: 3 })
        ));
        assert!(matches!(
            validate("%bcdef"),
            Err(InvalidId::Character { character: '%', position: 0 })
        ));
        assert!(matches!(
            validate("abcdeé"),
            Err(InvalidId::Character { character: 'é', position: 5 })
        ));
        assert!(validate("abc-ef").is_err());
        assert!(validate("abc ef").is_err());
    }

    #[test]
    fn table_matches_alphabet() {
        let valid = (0..=255_u8).filter(|b| VALID[usize::from(*b)]).count();
        assert_eq!(valid, 62);
        assert!(ALPHABET.iter().all(u8::is_ascii_alphanumeric));
    }

    #[test]
    fn minted_ids_are_valid() {
        let control = ClockControl::new();
        let clock = control.to_clock();

        for i in 0..100 {
            control.advance(Duration::from_nanos(1));
            let id = mint(&format!("https://example.com/{i}"), &clock);
            assert_eq!(validate(&id), Ok(()), "{id}");
        }
    }

    #[test]
    fn minting_depends_on_time() {
        let control = ClockControl::new();
        let clock = control.to_clock();

        let first = mint("https://example.com", &clock);
        assert_eq!(first, mint("https://example.com", &clock));

        control.advance(Duration::from_nanos(1));
        assert_ne!(first, mint("https://example.com", &clock));
    }

    #[test]
    fn encode_uses_low_digits() {
        assert_eq!(encode(0), "AAAAAA");
        assert_eq!(encode(1), "AAAAAB");
        assert_eq!(encode(61), "AAAAA9");
        assert_eq!(encode(62), "AAAABA");
    }
}
