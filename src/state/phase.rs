//! Discovery phase definitions
//!
//! The discovery loop moves each navigation page through these phases.

use std::fmt;

/// Represents the phase the discovery loop is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryPhase {
    /// Waiting to pop the next URL from the frontier
    Idle,

    /// A page fetch is in flight
    Fetching,

    /// Outbound links of the fetched page are being classified
    Classifying,

    /// Newly found sections are being appended to the output log
    Persisting,

    /// The page is being marked visited and the politeness delay applied
    Draining,

    /// The frontier is exhausted
    Done,
}

impl DiscoveryPhase {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns whether the loop may move from this phase to `next`
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Fetching)
                | (Self::Idle, Self::Done)
                | (Self::Fetching, Self::Classifying)
                | (Self::Fetching, Self::Idle)
                | (Self::Classifying, Self::Persisting)
                | (Self::Persisting, Self::Draining)
                | (Self::Draining, Self::Idle)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Classifying => "classifying",
            Self::Persisting => "persisting",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }

    /// Returns all phases in loop order
    pub fn all_phases() -> Vec<Self> {
        vec![
            Self::Idle,
            Self::Fetching,
            Self::Classifying,
            Self::Persisting,
            Self::Draining,
            Self::Done,
        ]
    }
}

impl fmt::Display for DiscoveryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
