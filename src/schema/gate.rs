use serde::{Deserialize, Serialize};

use super::altar::{AltarId, AltarQuery};

/// How a requirement combines its altar ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GateMode {
    /// Every listed altar must be awakened.
    #[default]
    All,
    /// At least one listed altar must be awakened.
    Any,
}

impl GateMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
        }
    }
}

/// The altars a gated object depends on.
///
/// An empty id list is a valid requirement that is never satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GateRequirement {
    pub altar_ids: Vec<AltarId>,
    #[serde(default)]
    pub mode: GateMode,
}

impl GateRequirement {
    pub fn new(altar_ids: Vec<AltarId>, mode: GateMode) -> Self {
        Self { altar_ids, mode }
    }

    pub fn all(altar_ids: &[u32]) -> Self {
        Self::new(altar_ids.iter().copied().map(AltarId).collect(), GateMode::All)
    }

    pub fn any(altar_ids: &[u32]) -> Self {
        Self::new(altar_ids.iter().copied().map(AltarId).collect(), GateMode::Any)
    }

    pub fn is_empty(&self) -> bool {
        self.altar_ids.is_empty()
    }

    /// Returns true if `id` is one of the required altars.
    pub fn contains(&self, id: AltarId) -> bool {
        self.altar_ids.contains(&id)
    }

    /// Evaluate against current altar state. Pure: same state, same answer.
    pub fn is_satisfied<Q: AltarQuery + ?Sized>(&self, altars: &Q) -> bool {
        if self.altar_ids.is_empty() {
            return false;
        }
        match self.mode {
            GateMode::All => self.altar_ids.iter().all(|id| altars.is_awakened(*id)),
            GateMode::Any => self.altar_ids.iter().any(|id| altars.is_awakened(*id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    struct Awake(FxHashSet<AltarId>);

    impl AltarQuery for Awake {
        fn is_awakened(&self, id: AltarId) -> bool {
            self.0.contains(&id)
        }

        fn awakened_chain_count(&self) -> usize {
            self.0.len()
        }
    }

    fn awake(ids: &[u32]) -> Awake {
        Awake(ids.iter().copied().map(AltarId).collect())
    }

    #[test]
    fn all_mode_needs_every_altar() {
        let req = GateRequirement::all(&[1, 2, 3]);
        assert!(!req.is_satisfied(&awake(&[])));
        assert!(!req.is_satisfied(&awake(&[1, 2])));
        assert!(req.is_satisfied(&awake(&[1, 2, 3])));
        assert!(req.is_satisfied(&awake(&[1, 2, 3, 4])));
    }

    #[test]
    fn any_mode_needs_one_altar() {
        let req = GateRequirement::any(&[1, 2]);
        assert!(!req.is_satisfied(&awake(&[3])));
        assert!(req.is_satisfied(&awake(&[2])));
        assert!(req.is_satisfied(&awake(&[1, 2])));
    }

    #[test]
    fn empty_requirement_never_satisfied() {
        assert!(!GateRequirement::all(&[]).is_satisfied(&awake(&[1])));
        assert!(!GateRequirement::any(&[]).is_satisfied(&awake(&[1])));
    }

    #[test]
    fn mode_defaults_to_all_in_ron() {
        let req: GateRequirement = ron::from_str("(altar_ids: [5, 6])").unwrap();
        assert_eq!(req.mode, GateMode::All);
        assert!(req.contains(AltarId(6)));
        assert!(!req.contains(AltarId(7)));
    }
}
