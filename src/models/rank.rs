//! Rank: a fixed-point decimal position within a rundown.
//!
//! Ranks must preserve resolved order, stay stable across polls when
//! order is unchanged, and support midpoint insertion without rewriting
//! the whole rundown. `rust_decimal` gives exact base-10 fixed point, so
//! the precision-floor check (`rankFractionFloor`) is exact rather than
//! being at the mercy of binary float rounding.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(pub Decimal);

impl Rank {
    pub fn integer(n: u32) -> Self {
        Rank(Decimal::from(n))
    }

    /// Midpoint between two ranks. Callers must check [`Rank::gap`] against
    /// the configured precision floor before trusting this value.
    pub fn midpoint(lo: Rank, hi: Rank) -> Rank {
        Rank((lo.0 + hi.0) / Decimal::from(2))
    }

    /// Absolute distance between two ranks.
    pub fn gap(lo: Rank, hi: Rank) -> Decimal {
        (hi.0 - lo.0).abs()
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Rank {
    fn from(n: u32) -> Self {
        Rank::integer(n)
    }
}
