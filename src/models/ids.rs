//! Opaque identifier newtypes.
//!
//! `PlaylistId`, `RundownId`, and `SegmentId` are all plain strings at the
//! wire level, but keeping them distinct types prevents accidentally
//! passing a segment id where a rundown id is expected, which the spec's
//! `${PlaylistId}_<ordinal>` derivation makes easy to get wrong.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

opaque_id!(PlaylistId);
opaque_id!(RundownId);
opaque_id!(SegmentId);

impl PlaylistId {
    /// Derive the Nth rundown id for this playlist, ordinal starting at 1.
    pub fn rundown_id(&self, ordinal: usize) -> RundownId {
        RundownId(format!("{}_{}", self.0, ordinal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rundown_id_derivation_starts_at_one() {
        let playlist = PlaylistId::from("QUEUE");
        assert_eq!(playlist.rundown_id(1).as_str(), "QUEUE_1");
        assert_eq!(playlist.rundown_id(2).as_str(), "QUEUE_2");
    }
}
