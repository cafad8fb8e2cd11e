/// Altar prop: the trigger volume that awakens an altar in the registry.
use log::debug;

use crate::core::dialogue::{select_chain_message, DialogueLatch};
use crate::core::registry::{AltarRegistry, Dispatch};
use crate::schema::altar::AltarId;
use crate::schema::config::AltarConfig;
use crate::schema::effect::Effect;

/// One altar in the world.
///
/// Overlapping occupants are counted: the first to enter awakens the
/// altar and only the last to leave can put it back to sleep.
#[derive(Debug, Clone)]
pub struct AltarProp {
    name: String,
    id: AltarId,
    stay_awakened_once: bool,
    show_dialogue_on_awaken: bool,
    lock_to_fixed_dialogue: bool,
    fixed_message: String,
    messages: Vec<String>,
    awakened: bool,
    has_been_awakened: bool,
    occupants: u32,
    dialogue: DialogueLatch,
}

impl AltarProp {
    pub fn from_config(config: &AltarConfig) -> Self {
        Self {
            name: config.name.clone(),
            id: config.id,
            stay_awakened_once: config.stay_awakened_once,
            show_dialogue_on_awaken: config.show_dialogue_on_awaken,
            lock_to_fixed_dialogue: config.lock_to_fixed_dialogue,
            fixed_message: config.fixed_message.clone(),
            messages: config.messages.clone(),
            awakened: false,
            has_been_awakened: false,
            occupants: 0,
            dialogue: DialogueLatch::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> AltarId {
        self.id
    }

    /// Fixed-dialogue altars stay out of the awakened chain.
    pub fn counts_in_chain(&self) -> bool {
        !self.lock_to_fixed_dialogue
    }

    pub fn is_awakened(&self) -> bool {
        self.awakened
    }

    pub fn occupants(&self) -> u32 {
        self.occupants
    }

    pub fn spawn_effects(&self) -> Vec<Effect> {
        vec![Effect::SetRunesLit {
            prop: self.name.clone(),
            lit: false,
        }]
    }

    /// Something stepped into the trigger volume.
    pub fn on_enter(&mut self, registry: &mut AltarRegistry) -> Dispatch {
        self.occupants += 1;
        self.activate(registry)
    }

    /// Something left the trigger volume.
    pub fn on_exit(&mut self, registry: &mut AltarRegistry) -> Dispatch {
        self.occupants = self.occupants.saturating_sub(1);
        if self.occupants > 0 {
            debug!("{}: still occupied ({})", self.name, self.occupants);
            return Dispatch::default();
        }
        if self.stay_awakened_once && self.has_been_awakened {
            return Dispatch::default();
        }

        let mut effects = vec![Effect::SetRunesLit {
            prop: self.name.clone(),
            lit: false,
        }];
        if !self.awakened {
            return Dispatch {
                effects,
                ..Dispatch::default()
            };
        }
        self.awakened = false;
        let mut dispatch = registry.deactivate(self.id, self.counts_in_chain());
        effects.append(&mut dispatch.effects);
        dispatch.effects = effects;
        dispatch
    }

    /// Awaken as if something stepped on the altar, without occupying it.
    pub fn force_awaken(&mut self, registry: &mut AltarRegistry) -> Dispatch {
        self.activate(registry)
    }

    /// The altar's own awaken dialogue is queued after whatever the
    /// registry's listeners produced.
    fn activate(&mut self, registry: &mut AltarRegistry) -> Dispatch {
        let mut effects = vec![Effect::SetRunesLit {
            prop: self.name.clone(),
            lit: true,
        }];
        if self.awakened {
            return Dispatch {
                effects,
                ..Dispatch::default()
            };
        }

        self.awakened = true;
        self.has_been_awakened = true;
        let mut dispatch = registry.awaken(self.id, self.counts_in_chain());
        effects.append(&mut dispatch.effects);
        if let Some(message) = self.take_awaken_message(registry) {
            effects.push(Effect::ShowDialogue(message));
        }
        dispatch.effects = effects;
        dispatch
    }

    /// Show the awaken dialogue now if it has not been shown yet.
    pub fn trigger_dialogue(&mut self, registry: &AltarRegistry) -> Option<Effect> {
        self.take_awaken_message(registry).map(Effect::ShowDialogue)
    }

    fn take_awaken_message(&mut self, registry: &AltarRegistry) -> Option<String> {
        if !self.show_dialogue_on_awaken || !self.dialogue.try_fire() {
            return None;
        }
        if self.lock_to_fixed_dialogue {
            return Some(self.fixed_message.clone());
        }
        select_chain_message(&self.messages, registry.awakened_chain_count()).map(str::to_string)
    }

    pub fn has_shown_dialogue(&self) -> bool {
        self.dialogue.has_fired()
    }

    pub fn reset_dialogue_state(&mut self) {
        self.dialogue.reset();
    }

    pub fn set_messages(&mut self, messages: Vec<String>) {
        self.messages = messages;
    }

    /// Back to the spawn state: dormant, unoccupied, dialogue re-armed.
    pub fn reset(&mut self) {
        self.awakened = false;
        self.has_been_awakened = false;
        self.occupants = 0;
        self.dialogue.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::altar::AltarEvent;

    fn config(id: u32) -> AltarConfig {
        ron::from_str(&format!("(name: \"altar_{id}\", id: {id})")).unwrap()
    }

    fn dialogue_of(dispatch: &Dispatch) -> Vec<&str> {
        dispatch
            .effects
            .iter()
            .filter_map(|e| match e {
                Effect::ShowDialogue(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn enter_awakens_and_shows_chain_message() {
        let mut registry = AltarRegistry::new();
        let mut first = AltarProp::from_config(&config(0));
        let mut second = AltarProp::from_config(&config(1));

        let dispatch = first.on_enter(&mut registry);
        assert_eq!(dispatch.events, vec![AltarEvent::Awakened(AltarId(0))]);
        assert!(dialogue_of(&dispatch)[0].starts_with("The first ancient altar"));

        let dispatch = second.on_enter(&mut registry);
        assert!(dialogue_of(&dispatch)[0].starts_with("Another altar responds"));
    }

    #[test]
    fn stay_awakened_altar_ignores_exit() {
        let mut registry = AltarRegistry::new();
        let mut altar = AltarProp::from_config(&config(0));
        altar.on_enter(&mut registry);
        let dispatch = altar.on_exit(&mut registry);
        assert!(dispatch.is_quiet());
        assert!(dispatch.effects.is_empty());
        assert!(registry.is_awakened(AltarId(0)));
    }

    #[test]
    fn releasable_altar_deactivates_on_exit() {
        let mut registry = AltarRegistry::new();
        let mut cfg = config(0);
        cfg.stay_awakened_once = false;
        let mut altar = AltarProp::from_config(&cfg);

        altar.on_enter(&mut registry);
        let dispatch = altar.on_exit(&mut registry);
        assert_eq!(dispatch.events, vec![AltarEvent::Deactivated(AltarId(0))]);
        assert!(!altar.is_awakened());
        assert!(!registry.is_awakened(AltarId(0)));
    }

    #[test]
    fn overlapping_occupants_keep_altar_awake() {
        let mut registry = AltarRegistry::new();
        let mut cfg = config(0);
        cfg.stay_awakened_once = false;
        let mut altar = AltarProp::from_config(&cfg);

        altar.on_enter(&mut registry);
        let second = altar.on_enter(&mut registry);
        assert!(second.is_quiet());

        assert!(altar.on_exit(&mut registry).is_quiet());
        assert!(registry.is_awakened(AltarId(0)));
        assert!(!altar.on_exit(&mut registry).is_quiet());
        assert!(!registry.is_awakened(AltarId(0)));

        // Extra exits never underflow.
        altar.on_exit(&mut registry);
        assert_eq!(altar.occupants(), 0);
    }

    #[test]
    fn dialogue_shows_once_across_cycles() {
        let mut registry = AltarRegistry::new();
        let mut cfg = config(0);
        cfg.stay_awakened_once = false;
        let mut altar = AltarProp::from_config(&cfg);

        assert_eq!(dialogue_of(&altar.on_enter(&mut registry)).len(), 1);
        for _ in 0..3 {
            altar.on_exit(&mut registry);
            assert!(dialogue_of(&altar.on_enter(&mut registry)).is_empty());
        }
        assert!(altar.has_shown_dialogue());

        altar.on_exit(&mut registry);
        altar.reset_dialogue_state();
        assert_eq!(dialogue_of(&altar.on_enter(&mut registry)).len(), 1);
    }

    #[test]
    fn fixed_dialogue_altar_is_outside_chain() {
        let mut registry = AltarRegistry::new();
        let mut cfg = config(4);
        cfg.lock_to_fixed_dialogue = true;
        let mut altar = AltarProp::from_config(&cfg);

        let dispatch = altar.on_enter(&mut registry);
        assert_eq!(dialogue_of(&dispatch), vec!["This altar has been activated."]);
        assert_eq!(registry.awakened_chain_count(), 0);
        assert_eq!(registry.total_awakened_count(), 1);
    }

    #[test]
    fn force_awaken_does_not_occupy() {
        let mut registry = AltarRegistry::new();
        let mut altar = AltarProp::from_config(&config(2));
        let dispatch = altar.force_awaken(&mut registry);
        assert!(!dispatch.is_quiet());
        assert_eq!(altar.occupants(), 0);
        assert!(altar.trigger_dialogue(&registry).is_none());
    }

    #[test]
    fn reset_lets_a_latched_altar_awaken_again() {
        let mut registry = AltarRegistry::new();
        let mut altar = AltarProp::from_config(&config(0));
        altar.on_enter(&mut registry);
        registry.reset();
        altar.reset();
        assert!(!altar.is_awakened());
        assert_eq!(altar.occupants(), 0);

        let dispatch = altar.on_enter(&mut registry);
        assert_eq!(dispatch.events, vec![AltarEvent::Awakened(AltarId(0))]);
        assert_eq!(dialogue_of(&dispatch).len(), 1);
    }

    #[test]
    fn replaced_messages_drive_the_next_awaken() {
        let mut registry = AltarRegistry::new();
        let mut altar = AltarProp::from_config(&config(0));
        altar.set_messages(vec!["Dust falls from the runes.".to_string()]);
        let dispatch = altar.on_enter(&mut registry);
        assert_eq!(dialogue_of(&dispatch), vec!["Dust falls from the runes."]);
    }

    #[test]
    fn silent_altar_shows_nothing() {
        let mut registry = AltarRegistry::new();
        let mut cfg = config(0);
        cfg.show_dialogue_on_awaken = false;
        let mut altar = AltarProp::from_config(&cfg);
        assert!(dialogue_of(&altar.on_enter(&mut registry)).is_empty());
        assert!(!altar.has_shown_dialogue());
    }
}
