/// Gate evaluation: a CLOSED/OPEN latch over an altar condition.
use log::{debug, warn};

use crate::schema::altar::{AltarId, AltarQuery};
use crate::schema::gate::GateRequirement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    Closed,
    Open,
}

/// Returned by `recompute` only when the state actually flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    Opened,
    Closed,
}

/// What a gate waits for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateCondition {
    /// A set of specific altars (doors).
    Altars(GateRequirement),
    /// A number of awakened chain altars, whichever they are (chests).
    ChainCount { at_least: usize },
}

impl GateCondition {
    pub fn is_satisfied<Q: AltarQuery + ?Sized>(&self, altars: &Q) -> bool {
        match self {
            Self::Altars(requirement) => requirement.is_satisfied(altars),
            Self::ChainCount { at_least } => altars.awakened_chain_count() >= *at_least,
        }
    }

    /// Whether an event about `id` can change the outcome.
    pub fn watches(&self, id: AltarId) -> bool {
        match self {
            Self::Altars(requirement) => requirement.contains(id),
            Self::ChainCount { .. } => true,
        }
    }

    fn never_opens(&self) -> bool {
        matches!(self, Self::Altars(requirement) if requirement.is_empty())
    }
}

/// Latch that reports each CLOSED/OPEN flip exactly once.
#[derive(Debug, Clone)]
pub struct GateEvaluator {
    name: String,
    condition: GateCondition,
    state: GateState,
}

impl GateEvaluator {
    pub fn new(name: &str, condition: GateCondition) -> Self {
        if condition.never_opens() {
            warn!("gate '{}' has no required altars and will never open", name);
        }
        Self {
            name: name.to_string(),
            condition,
            state: GateState::Closed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn condition(&self) -> &GateCondition {
        &self.condition
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == GateState::Open
    }

    pub fn should_be_open<Q: AltarQuery + ?Sized>(&self, altars: &Q) -> bool {
        self.condition.is_satisfied(altars)
    }

    /// Bring the latch in line with current altar state.
    pub fn recompute<Q: AltarQuery + ?Sized>(&mut self, altars: &Q) -> Option<GateTransition> {
        let target = if self.should_be_open(altars) {
            GateState::Open
        } else {
            GateState::Closed
        };
        self.force(target)
    }

    /// Set the latch directly, bypassing the condition.
    pub fn force(&mut self, target: GateState) -> Option<GateTransition> {
        if self.state == target {
            return None;
        }
        self.state = target;
        debug!("gate '{}' -> {:?}", self.name, target);
        Some(match target {
            GateState::Open => GateTransition::Opened,
            GateState::Closed => GateTransition::Closed,
        })
    }

    /// Swap the condition. The latch is not re-evaluated until the next
    /// `recompute`.
    pub fn set_condition(&mut self, condition: GateCondition) {
        if condition.never_opens() {
            warn!("gate '{}' has no required altars and will never open", self.name);
        }
        self.condition = condition;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::AltarRegistry;

    fn door(ids: &[u32]) -> GateEvaluator {
        GateEvaluator::new("door", GateCondition::Altars(GateRequirement::all(ids)))
    }

    #[test]
    fn all_gate_opens_once_and_closes_on_any_loss() {
        let mut registry = AltarRegistry::new();
        let mut gate = door(&[1, 2, 3]);

        registry.awaken(AltarId(1), true);
        registry.awaken(AltarId(2), true);
        assert_eq!(gate.recompute(&registry), None);

        registry.awaken(AltarId(3), true);
        assert_eq!(gate.recompute(&registry), Some(GateTransition::Opened));
        assert_eq!(gate.recompute(&registry), None);
        assert!(gate.is_open());

        registry.deactivate(AltarId(2), true);
        assert_eq!(gate.recompute(&registry), Some(GateTransition::Closed));
        assert_eq!(gate.recompute(&registry), None);
    }

    #[test]
    fn any_gate_closes_only_when_all_gone() {
        let mut registry = AltarRegistry::new();
        let mut gate = GateEvaluator::new(
            "any",
            GateCondition::Altars(GateRequirement::any(&[1, 2])),
        );

        registry.awaken(AltarId(2), true);
        assert_eq!(gate.recompute(&registry), Some(GateTransition::Opened));
        registry.awaken(AltarId(1), true);
        assert_eq!(gate.recompute(&registry), None);
        registry.deactivate(AltarId(2), true);
        assert_eq!(gate.recompute(&registry), None);
        registry.deactivate(AltarId(1), true);
        assert_eq!(gate.recompute(&registry), Some(GateTransition::Closed));
    }

    #[test]
    fn empty_gate_stays_closed() {
        let mut registry = AltarRegistry::new();
        let mut gate = door(&[]);
        registry.awaken(AltarId(1), true);
        assert_eq!(gate.recompute(&registry), None);
        assert_eq!(gate.state(), GateState::Closed);
    }

    #[test]
    fn chain_count_condition() {
        let mut registry = AltarRegistry::new();
        let mut gate = GateEvaluator::new("chest", GateCondition::ChainCount { at_least: 2 });

        registry.awaken(AltarId(7), true);
        registry.awaken(AltarId(8), false);
        assert_eq!(gate.recompute(&registry), None);

        registry.awaken(AltarId(9), true);
        assert_eq!(gate.recompute(&registry), Some(GateTransition::Opened));
        assert!(gate.condition().watches(AltarId(100)));
    }

    #[test]
    fn force_then_recompute_converges() {
        let registry = AltarRegistry::new();
        let mut gate = door(&[1]);
        assert_eq!(gate.force(GateState::Open), Some(GateTransition::Opened));
        assert_eq!(gate.force(GateState::Open), None);
        assert_eq!(gate.recompute(&registry), Some(GateTransition::Closed));
    }

    #[test]
    fn set_condition_applies_on_next_recompute() {
        let mut registry = AltarRegistry::new();
        let mut gate = door(&[1]);
        registry.awaken(AltarId(2), true);
        assert_eq!(gate.recompute(&registry), None);

        gate.set_condition(GateCondition::Altars(GateRequirement::all(&[2])));
        assert!(!gate.is_open());
        assert_eq!(gate.recompute(&registry), Some(GateTransition::Opened));
        assert!(!gate.condition().watches(AltarId(1)));
    }
}
