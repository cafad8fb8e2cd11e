use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype wrapper for altar IDs.
///
/// IDs come straight from stage data and are not required to be
/// contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AltarId(pub u32);

impl fmt::Display for AltarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-altar state held by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AltarState {
    pub awakened: bool,
    /// Whether this altar counts toward the awakened chain. Last write wins.
    pub counts_in_chain: bool,
}

/// A notification broadcast to registry subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AltarEvent {
    Awakened(AltarId),
    Deactivated(AltarId),
}

impl AltarEvent {
    /// The altar this event is about.
    pub fn altar(&self) -> AltarId {
        match self {
            Self::Awakened(id) | Self::Deactivated(id) => *id,
        }
    }

    pub fn is_awakened(&self) -> bool {
        matches!(self, Self::Awakened(_))
    }
}

/// Read access to altar state.
///
/// Gates and listeners only ever need these queries, so they take this
/// trait rather than the registry itself.
pub trait AltarQuery {
    /// False for unknown ids.
    fn is_awakened(&self, id: AltarId) -> bool;

    /// Number of awakened altars that count toward the chain.
    fn awakened_chain_count(&self) -> usize;
}
