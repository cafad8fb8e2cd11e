/// Doors: altar-sealed doors that open by themselves, and plain locked
/// doors that need the chest key.

use log::info;

use crate::core::dialogue::DialogueLatch;
use crate::core::gate::{GateCondition, GateEvaluator, GateState, GateTransition};
use crate::core::registry::{AltarListener, AltarStates, Reactions};
use crate::schema::altar::{AltarEvent, AltarQuery};
use crate::schema::config::{AltarDoorConfig, KeyDoorConfig};
use crate::schema::effect::{Cue, Effect};
use crate::schema::gate::GateRequirement;

fn door_effects(prop: &str, open: bool) -> [Effect; 2] {
    [
        Effect::SetDoorOpen {
            prop: prop.to_string(),
            open,
        },
        Effect::SetCollidable {
            prop: prop.to_string(),
            collidable: !open,
        },
    ]
}

fn push_message(out: &mut Vec<Effect>, message: &str) {
    if !message.is_empty() {
        out.push(Effect::ShowDialogue(message.to_string()));
    }
}

/// A door sealed by altars. Open exactly while its requirement holds.
#[derive(Debug, Clone)]
pub struct AltarDoor {
    gate: GateEvaluator,
    config: AltarDoorConfig,
    first_approach: DialogueLatch,
    open_dialogue: DialogueLatch,
    approach_cooldown: f32,
    last_approach: Option<f32>,
}

impl AltarDoor {
    pub fn from_config(config: &AltarDoorConfig, approach_cooldown: f32) -> Self {
        Self {
            gate: GateEvaluator::new(&config.name, GateCondition::Altars(config.requirement())),
            config: config.clone(),
            first_approach: DialogueLatch::default(),
            open_dialogue: DialogueLatch::default(),
            approach_cooldown,
            last_approach: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_open(&self) -> bool {
        self.gate.is_open()
    }

    pub fn spawn_effects(&self) -> Vec<Effect> {
        door_effects(self.name(), false).to_vec()
    }

    /// Bring the door in line with altar state. Used for events and for
    /// the per-tick polling fallback.
    pub fn sync<Q: AltarQuery + ?Sized>(&mut self, altars: &Q, out: &mut Vec<Effect>) {
        let transition = self.gate.recompute(altars);
        self.apply(transition, out);
    }

    /// The player walked up to the door. Returns false while cooling down.
    pub fn approach<Q: AltarQuery + ?Sized>(
        &mut self,
        now: f32,
        altars: &Q,
        out: &mut Vec<Effect>,
    ) -> bool {
        if let Some(last) = self.last_approach {
            if now <= last + self.approach_cooldown {
                return false;
            }
        }
        self.last_approach = Some(now);

        if self.gate.is_open() {
            return true;
        }
        if self.gate.should_be_open(altars) {
            self.sync(altars, out);
            return true;
        }

        if self.config.show_first_approach && self.first_approach.try_fire() {
            push_message(out, &self.config.first_approach_message);
        } else if self.config.show_no_key {
            push_message(out, &self.config.no_key_message);
        }
        out.push(Effect::clip(self.name(), Cue::DoorLocked));
        true
    }

    pub fn force_open(&mut self, out: &mut Vec<Effect>) {
        let transition = self.gate.force(GateState::Open);
        self.apply(transition, out);
    }

    pub fn force_close(&mut self, out: &mut Vec<Effect>) {
        let transition = self.gate.force(GateState::Closed);
        self.apply(transition, out);
    }

    /// Replace the requirement. Takes effect on the next sync.
    pub fn set_required_altars(&mut self, requirement: GateRequirement) {
        self.config.required_altars = requirement.altar_ids.clone();
        self.config.mode = requirement.mode;
        self.gate.set_condition(GateCondition::Altars(requirement));
    }

    pub fn reset_dialogue_states(&mut self) {
        self.first_approach.reset();
        self.open_dialogue.reset();
    }

    /// Closed, with dialogue and approach cooldown re-armed. Emits nothing.
    pub fn reset(&mut self) {
        self.gate.force(GateState::Closed);
        self.reset_dialogue_states();
        self.last_approach = None;
    }

    /// Human-readable requirement status, e.g. `all of [1: Active] [2: Inactive]`.
    pub fn status<Q: AltarQuery + ?Sized>(&self, altars: &Q) -> String {
        if self.config.required_altars.is_empty() {
            return "no required altars".to_string();
        }
        let parts: Vec<String> = self
            .config
            .required_altars
            .iter()
            .map(|id| {
                let state = if altars.is_awakened(*id) {
                    "Active"
                } else {
                    "Inactive"
                };
                format!("[{id}: {state}]")
            })
            .collect();
        format!("{} of {}", self.config.mode.label(), parts.join(" "))
    }

    fn apply(&mut self, transition: Option<GateTransition>, out: &mut Vec<Effect>) {
        match transition {
            Some(GateTransition::Opened) => {
                info!("door '{}' opened", self.name());
                out.extend(door_effects(self.name(), true));
                if self.config.show_open && self.open_dialogue.try_fire() {
                    push_message(out, &self.config.open_message);
                }
                out.push(Effect::clip(self.name(), Cue::DoorOpen));
            }
            Some(GateTransition::Closed) => {
                info!("door '{}' closed", self.name());
                out.extend(door_effects(self.name(), false));
                self.open_dialogue.reset();
                out.push(Effect::clip(self.name(), Cue::DoorLocked));
            }
            None => {}
        }
    }
}

impl AltarListener for AltarDoor {
    fn on_altar_event(&mut self, event: AltarEvent, altars: &AltarStates, out: &mut Reactions) {
        if !self.gate.condition().watches(event.altar()) {
            return;
        }
        let mut effects = Vec::new();
        self.sync(altars, &mut effects);
        out.extend(effects);
    }
}

/// A locked door opened with the key from the chest.
#[derive(Debug, Clone)]
pub struct KeyDoor {
    config: KeyDoorConfig,
    open: bool,
    player_nearby: bool,
    highlighted: bool,
    first_approach: DialogueLatch,
    open_dialogue: DialogueLatch,
}

impl KeyDoor {
    pub fn from_config(config: &KeyDoorConfig) -> Self {
        Self {
            config: config.clone(),
            open: false,
            player_nearby: false,
            highlighted: false,
            first_approach: DialogueLatch::default(),
            open_dialogue: DialogueLatch::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_player_nearby(&self) -> bool {
        self.player_nearby
    }

    pub fn spawn_effects(&self) -> Vec<Effect> {
        door_effects(self.name(), false).to_vec()
    }

    /// Update player proximity. Entering range the first time without the
    /// key shows the first-approach message.
    pub fn set_player_nearby(&mut self, nearby: bool, has_key: bool, out: &mut Vec<Effect>) {
        if nearby == self.player_nearby {
            return;
        }
        self.player_nearby = nearby;

        if nearby {
            if self.config.enable_dialogue && !has_key && self.first_approach.try_fire() {
                push_message(out, &self.config.first_approach_message);
            }
            if !self.open {
                self.set_highlight(true, out);
            }
        } else {
            self.set_highlight(false, out);
        }
    }

    /// Interact while in range. Returns true if the door opened.
    pub fn interact(&mut self, has_key: bool, out: &mut Vec<Effect>) -> bool {
        if !self.player_nearby || self.open {
            return false;
        }
        if !has_key {
            if self.config.enable_dialogue {
                push_message(out, &self.config.no_key_message);
            }
            return false;
        }

        self.first_approach.try_fire();
        self.open = true;
        info!("key door '{}' opened", self.name());
        if self.config.enable_dialogue && self.open_dialogue.try_fire() {
            push_message(out, &self.config.open_message);
        }
        out.push(Effect::clip(self.name(), Cue::DoorOpen));
        out.extend(door_effects(self.name(), true));
        self.set_highlight(false, out);
        true
    }

    /// Locked, out of range, dialogue re-armed. Emits nothing.
    pub fn reset(&mut self) {
        self.open = false;
        self.player_nearby = false;
        self.highlighted = false;
        self.first_approach.reset();
        self.open_dialogue.reset();
    }

    fn set_highlight(&mut self, on: bool, out: &mut Vec<Effect>) {
        if self.highlighted != on {
            self.highlighted = on;
            out.push(Effect::SetHighlight {
                prop: self.name().to_string(),
                highlighted: on,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::AltarRegistry;
    use crate::schema::altar::AltarId;

    fn sealed(ids: &str) -> AltarDoor {
        let config: AltarDoorConfig =
            ron::from_str(&format!("(name: \"gate\", required_altars: {ids})")).unwrap();
        AltarDoor::from_config(&config, 1.0)
    }

    fn messages(effects: &[Effect]) -> Vec<&str> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::ShowDialogue(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn door_opens_and_closes_with_altars() {
        let mut registry = AltarRegistry::new();
        let mut door = sealed("[1]");
        let mut out = Vec::new();

        registry.awaken(AltarId(1), true);
        door.sync(registry.states(), &mut out);
        assert!(door.is_open());
        assert!(out.contains(&Effect::clip("gate", Cue::DoorOpen)));
        assert_eq!(messages(&out).len(), 1);

        out.clear();
        door.sync(registry.states(), &mut out);
        assert!(out.is_empty());

        registry.deactivate(AltarId(1), true);
        door.sync(registry.states(), &mut out);
        assert!(!door.is_open());
        assert!(out.contains(&Effect::clip("gate", Cue::DoorLocked)));
    }

    #[test]
    fn open_dialogue_rearms_after_close() {
        let mut registry = AltarRegistry::new();
        let mut door = sealed("[1]");
        let mut out = Vec::new();

        for _ in 0..2 {
            registry.awaken(AltarId(1), true);
            door.sync(registry.states(), &mut out);
            registry.deactivate(AltarId(1), true);
            door.sync(registry.states(), &mut out);
        }
        assert_eq!(messages(&out).len(), 2);
    }

    #[test]
    fn approach_first_then_no_key_with_cooldown() {
        let registry = AltarRegistry::new();
        let mut door = sealed("[1]");
        let mut out = Vec::new();

        assert!(door.approach(0.0, registry.states(), &mut out));
        assert!(messages(&out)[0].starts_with("This ancient door"));
        assert!(!door.approach(0.5, registry.states(), &mut out));

        out.clear();
        assert!(door.approach(2.0, registry.states(), &mut out));
        assert!(messages(&out)[0].starts_with("The door remains sealed"));
        assert!(out.contains(&Effect::clip("gate", Cue::DoorLocked)));
    }

    #[test]
    fn first_approach_survives_door_cycles() {
        let mut registry = AltarRegistry::new();
        let mut door = sealed("[1]");
        let mut out = Vec::new();
        door.approach(0.0, registry.states(), &mut out);

        registry.awaken(AltarId(1), true);
        door.sync(registry.states(), &mut out);
        registry.deactivate(AltarId(1), true);
        door.sync(registry.states(), &mut out);

        out.clear();
        door.approach(5.0, registry.states(), &mut out);
        assert!(messages(&out)[0].starts_with("The door remains sealed"));
    }

    #[test]
    fn listener_ignores_unrelated_altars() {
        let mut registry = AltarRegistry::new();
        registry.subscribe(std::rc::Rc::new(std::cell::RefCell::new(sealed("[1]"))));
        let unrelated = registry.awaken(AltarId(2), true);
        assert!(unrelated.effects.is_empty());
        let related = registry.awaken(AltarId(1), true);
        assert!(!related.effects.is_empty());
    }

    #[test]
    fn force_and_status() {
        let mut registry = AltarRegistry::new();
        let mut door = sealed("[1, 2]");
        let mut out = Vec::new();

        door.force_open(&mut out);
        assert!(door.is_open());
        door.force_close(&mut out);
        assert!(!door.is_open());

        registry.awaken(AltarId(2), true);
        assert_eq!(
            door.status(registry.states()),
            "all of [1: Inactive] [2: Active]"
        );

        door.set_required_altars(GateRequirement::all(&[2]));
        door.sync(registry.states(), &mut out);
        assert!(door.is_open());
    }

    #[test]
    fn empty_messages_are_not_shown() {
        let config: AltarDoorConfig =
            ron::from_str("(name: \"quiet\", required_altars: [1], open_message: \"\")").unwrap();
        let mut door = AltarDoor::from_config(&config, 1.0);
        let mut registry = AltarRegistry::new();
        let mut out = Vec::new();
        registry.awaken(AltarId(1), true);
        door.sync(registry.states(), &mut out);
        assert!(messages(&out).is_empty());
    }

    fn key_door() -> KeyDoor {
        KeyDoor::from_config(&ron::from_str("(name: \"vault\")").unwrap())
    }

    #[test]
    fn key_door_needs_key() {
        let mut door = key_door();
        let mut out = Vec::new();

        door.set_player_nearby(true, false, &mut out);
        assert!(messages(&out)[0].starts_with("This door seems to be locked"));

        out.clear();
        assert!(!door.interact(false, &mut out));
        assert!(messages(&out)[0].starts_with("The door is locked tight"));

        out.clear();
        assert!(door.interact(true, &mut out));
        assert!(messages(&out)[0].starts_with("The key works"));
        assert!(door.is_open());
        assert!(!door.interact(true, &mut out));
    }

    #[test]
    fn key_door_first_approach_once() {
        let mut door = key_door();
        let mut out = Vec::new();
        door.set_player_nearby(true, false, &mut out);
        door.set_player_nearby(false, false, &mut out);
        out.clear();
        door.set_player_nearby(true, false, &mut out);
        assert!(messages(&out).is_empty());
        assert!(out.contains(&Effect::SetHighlight {
            prop: "vault".into(),
            highlighted: true
        }));
    }

    #[test]
    fn reset_closes_and_rearms() {
        let mut registry = AltarRegistry::new();
        let mut door = sealed("[1]");
        let mut out = Vec::new();
        door.approach(0.0, registry.states(), &mut out);
        registry.awaken(AltarId(1), true);
        door.sync(registry.states(), &mut out);

        door.reset();
        assert!(!door.is_open());
        out.clear();
        let fresh = AltarRegistry::new();
        assert!(door.approach(0.1, fresh.states(), &mut out));
        assert!(messages(&out)[0].starts_with("This ancient door"));

        let mut vault = key_door();
        vault.set_player_nearby(true, true, &mut out);
        vault.interact(true, &mut out);
        vault.reset();
        assert!(!vault.is_open());
        assert!(!vault.is_player_nearby());
    }

    #[test]
    fn key_door_out_of_range_ignores_interact() {
        let mut door = key_door();
        let mut out = Vec::new();
        assert!(!door.interact(true, &mut out));
        assert!(out.is_empty());
    }
}
