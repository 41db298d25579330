//! Boundary and content-ID generation.

use std::fmt;

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// Length of multipart boundary tokens.
pub const BOUNDARY_LENGTH: usize = 20;

/// Length of attachment content-ID tokens.
pub const CONTENT_ID_LENGTH: usize = 52;

/// Source of boundary and content-ID tokens for one message.
///
/// Random tokens are drawn uniformly from `[a-zA-Z0-9]`. Deterministic
/// tokens are a fixed prefix followed by a zero-padded counter that starts
/// at 1, which makes rendered output byte-reproducible.
#[derive(Clone)]
pub enum IdGenerator {
    /// Random alphanumeric tokens.
    Random(StdRng),
    /// Prefix plus an incrementing counter.
    Deterministic {
        /// Token prefix.
        prefix: String,
        /// Last counter value handed out.
        counter: u64,
    },
}

impl IdGenerator {
    /// Creates a random generator seeded from the OS.
    #[must_use]
    pub fn random() -> Self {
        Self::Random(StdRng::from_entropy())
    }

    /// Creates a deterministic generator with a fresh counter.
    #[must_use]
    pub fn deterministic(prefix: impl Into<String>) -> Self {
        Self::Deterministic {
            prefix: prefix.into(),
            counter: 0,
        }
    }

    /// Returns true for the prefix-and-counter mode.
    #[must_use]
    pub const fn is_deterministic(&self) -> bool {
        matches!(self, Self::Deterministic { .. })
    }

    /// Returns a token of exactly `length` characters.
    ///
    /// # Errors
    ///
    /// In deterministic mode, returns [`Error::TokenTooShort`] when the
    /// prefix and the counter digits do not fit in `length`.
    pub fn next_token(&mut self, length: usize) -> Result<String> {
        match self {
            Self::Random(rng) => Ok(rng
                .sample_iter(&Alphanumeric)
                .take(length)
                .map(char::from)
                .collect()),
            Self::Deterministic { prefix, counter } => {
                *counter += 1;
                let digits = counter.to_string();
                let prefix_len = prefix.chars().count();
                if prefix_len + digits.len() > length {
                    return Err(Error::TokenTooShort {
                        prefix: prefix.clone(),
                        counter: *counter,
                        length,
                    });
                }
                let width = length - prefix_len;
                Ok(format!("{prefix}{digits:0>width$}"))
            }
        }
    }

    /// Returns a boundary token.
    ///
    /// # Errors
    ///
    /// See [`IdGenerator::next_token`].
    pub fn next_boundary(&mut self) -> Result<String> {
        self.next_token(BOUNDARY_LENGTH)
    }

    /// Returns a content-ID token.
    ///
    /// # Errors
    ///
    /// See [`IdGenerator::next_token`].
    pub fn next_content_id(&mut self) -> Result<String> {
        self.next_token(CONTENT_ID_LENGTH)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::random()
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random(_) => f.write_str("IdGenerator::Random"),
            Self::Deterministic { prefix, counter } => f
                .debug_struct("IdGenerator::Deterministic")
                .field("prefix", prefix)
                .field("counter", counter)
                .finish(),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_deterministic_sequence() {
        let mut ids = IdGenerator::deterministic("BOUNDARY_ID_");
        assert_eq!(ids.next_boundary().unwrap(), "BOUNDARY_ID_00000001");
        assert_eq!(ids.next_boundary().unwrap(), "BOUNDARY_ID_00000002");
    }

    #[test]
    fn test_deterministic_content_id_width() {
        let mut ids = IdGenerator::deterministic("ATTACH_");
        let id = ids.next_content_id().unwrap();
        assert_eq!(id.len(), CONTENT_ID_LENGTH);
        assert!(id.starts_with("ATTACH_000"));
        assert!(id.ends_with("0001"));
    }

    #[test]
    fn test_token_too_short() {
        let mut ids = IdGenerator::deterministic("PREFIX_");
        let err = ids.next_token(7).unwrap_err();
        assert!(matches!(
            err,
            Error::TokenTooShort {
                counter: 1,
                length: 7,
                ..
            }
        ));
    }

    #[test]
    fn test_token_exactly_fits() {
        let mut ids = IdGenerator::deterministic("AB");
        assert_eq!(ids.next_token(3).unwrap(), "AB1");
    }

    #[test]
    fn test_counter_overflows_width() {
        let mut ids = IdGenerator::Deterministic {
            prefix: "AB".to_string(),
            counter: 9,
        };
        assert!(ids.next_token(3).is_err());
    }

    #[test]
    fn test_random_tokens_differ() {
        let mut ids = IdGenerator::random();
        let a = ids.next_boundary().unwrap();
        let b = ids.next_boundary().unwrap();
        assert_ne!(a, b);
        assert!(!ids.is_deterministic());
    }

    proptest! {
        #[test]
        fn prop_random_token_has_exact_length(length in 0usize..128) {
            let mut ids = IdGenerator::random();
            let token = ids.next_token(length).unwrap();
            prop_assert_eq!(token.len(), length);
            prop_assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        }

        #[test]
        fn prop_deterministic_token_has_exact_length(prefix in "[A-Z_]{0,10}", calls in 1usize..50) {
            let mut ids = IdGenerator::deterministic(prefix.clone());
            for _ in 0..calls {
                let token = ids.next_token(BOUNDARY_LENGTH).unwrap();
                prop_assert_eq!(token.len(), BOUNDARY_LENGTH);
                prop_assert!(token.starts_with(&prefix));
            }
        }
    }
}
