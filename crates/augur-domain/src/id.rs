//! Identifier types based on UUIDv7
//!
//! UUIDv7 provides:
//! - Chronological sortability (creation order is id order)
//! - 128-bit uniqueness without coordination between engine instances
//! - RFC 9562-standard string format

use std::fmt;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u128);

        impl $name {
            /// Generate a new UUIDv7-based identifier
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7().as_u128())
            }

            /// Create an identifier from a raw u128 value
            ///
            /// This is primarily for storage layer deserialization.
            pub fn from_value(value: u128) -> Self {
                Self(value)
            }

            /// Parse an identifier from its UUID string form
            pub fn from_string(s: &str) -> Result<Self, String> {
                uuid::Uuid::parse_str(s)
                    .map(|u| Self(u.as_u128()))
                    .map_err(|e| format!("Invalid UUID string: {}", e))
            }

            /// Get the raw u128 value
            pub fn value(&self) -> u128 {
                self.0
            }

            /// Timestamp component of the UUIDv7 (milliseconds since Unix epoch)
            pub fn timestamp(&self) -> u64 {
                (self.0 >> 80) as u64
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", uuid::Uuid::from_u128(self.0))
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_string(s)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier of a hypothesis
    HypothesisId
);

uuid_id!(
    /// Unique identifier of an evidence entry
    EvidenceId
);

uuid_id!(
    /// Unique identifier of a temporal episode
    EpisodeId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_ordering_is_chronological() {
        let first = HypothesisId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = HypothesisId::new();

        assert!(first < second);
        assert!(first.timestamp() <= second.timestamp());
    }

    #[test]
    fn test_display_and_parse() {
        let id = EvidenceId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(EvidenceId::from_string(&text).unwrap(), id);
        assert_eq!(text.parse::<EvidenceId>().unwrap(), id);
    }

    #[test]
    fn test_invalid_string() {
        assert!(EpisodeId::from_string("not-a-uuid").is_err());
        assert!(EpisodeId::from_string("").is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_ordering_matches_value(a: u128, b: u128) {
            let id_a = HypothesisId::from_value(a);
            let id_b = HypothesisId::from_value(b);
            prop_assert_eq!(id_a < id_b, a < b);
            prop_assert_eq!(id_a == id_b, a == b);
        }

        #[test]
        fn test_string_roundtrip(value: u128) {
            let id = HypothesisId::from_value(value);
            match HypothesisId::from_string(&id.to_string()) {
                Ok(parsed) => prop_assert_eq!(id, parsed),
                Err(e) => return Err(TestCaseError::fail(e)),
            }
        }
    }
}
