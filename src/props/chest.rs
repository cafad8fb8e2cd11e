/// Chest: appears once enough chain altars are awakened, and plays the
/// scripted open sequence that hands the player the key.

use log::{debug, info};

use crate::core::dialogue::DialogueLatch;
use crate::core::gate::{GateCondition, GateEvaluator, GateState, GateTransition};
use crate::core::registry::{AltarListener, AltarStates, Reactions};
use crate::core::sequence::{CancellationToken, Countdown, SequenceSlot};
use crate::schema::altar::{AltarEvent, AltarQuery};
use crate::schema::config::{ChestConfig, EngineSettings};
use crate::schema::effect::{Cue, Effect};

#[derive(Debug, Clone)]
pub struct Chest {
    config: ChestConfig,
    gate: GateEvaluator,
    open: bool,
    player_nearby: bool,
    highlighted: bool,
    open_dialogue: DialogueLatch,
}

impl Chest {
    pub fn from_config(config: &ChestConfig) -> Self {
        Self {
            gate: GateEvaluator::new(
                &config.name,
                GateCondition::ChainCount {
                    at_least: config.altars_required,
                },
            ),
            config: config.clone(),
            open: false,
            player_nearby: false,
            highlighted: false,
            open_dialogue: DialogueLatch::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_visible(&self) -> bool {
        self.gate.is_open()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn spawn_effects(&self) -> Vec<Effect> {
        self.visibility_effects(false)
    }

    /// Reveal or hide the chest according to the awakened chain count.
    pub fn sync<Q: AltarQuery + ?Sized>(&mut self, altars: &Q, out: &mut Vec<Effect>) {
        match self.gate.recompute(altars) {
            Some(GateTransition::Opened) => {
                info!(
                    "chest '{}' revealed ({} altars awakened)",
                    self.name(),
                    altars.awakened_chain_count()
                );
                out.extend(self.visibility_effects(true));
            }
            Some(GateTransition::Closed) => {
                debug!("chest '{}' hidden", self.name());
                out.extend(self.visibility_effects(false));
                self.set_highlight(false, out);
            }
            None => {}
        }
    }

    /// Re-run the visibility check on demand.
    pub fn force_check<Q: AltarQuery + ?Sized>(&mut self, altars: &Q, out: &mut Vec<Effect>) {
        self.sync(altars, out);
    }

    /// Hide regardless of altar state. The next sync may reveal it again.
    pub fn force_hide(&mut self, out: &mut Vec<Effect>) {
        self.gate.force(GateState::Closed);
        out.extend(self.visibility_effects(false));
        self.set_highlight(false, out);
    }

    /// Highlight only a visible, unopened chest.
    pub fn enter_range(&mut self, out: &mut Vec<Effect>) {
        if !self.player_nearby && self.is_visible() && !self.open {
            self.player_nearby = true;
            self.set_highlight(true, out);
        }
    }

    pub fn exit_range(&mut self, out: &mut Vec<Effect>) {
        if self.player_nearby {
            self.player_nearby = false;
            self.set_highlight(false, out);
        }
    }

    /// Open a visible, closed chest. The caller starts the open sequence
    /// when this returns true.
    pub fn try_open(&mut self, out: &mut Vec<Effect>) -> bool {
        if !self.is_visible() || self.open {
            return false;
        }
        self.open = true;
        info!("chest '{}' opened", self.name());
        out.push(Effect::SetChestOpen {
            prop: self.name().to_string(),
            open: true,
        });
        self.set_highlight(false, out);
        true
    }

    /// The open dialogue, once per chest until reset.
    pub fn take_open_dialogue(&mut self) -> Option<Effect> {
        if self.config.show_dialogue_on_open && self.open_dialogue.try_fire() {
            Some(Effect::ShowDialogue(self.config.open_message.clone()))
        } else {
            None
        }
    }

    /// Show the open dialogue again, ignoring the once-only flag.
    pub fn trigger_dialogue(&self) -> Option<Effect> {
        self.config
            .show_dialogue_on_open
            .then(|| Effect::ShowDialogue(self.config.open_message.clone()))
    }

    pub fn has_shown_open_dialogue(&self) -> bool {
        self.open_dialogue.has_fired()
    }

    /// Hidden, closed, out of range, dialogue re-armed. Emits nothing.
    pub fn reset(&mut self) {
        self.gate.force(GateState::Closed);
        self.open = false;
        self.player_nearby = false;
        self.highlighted = false;
        self.open_dialogue.reset();
    }

    pub fn reset_dialogue_state(&mut self) {
        self.open_dialogue.reset();
    }

    fn visibility_effects(&self, visible: bool) -> Vec<Effect> {
        vec![
            Effect::SetVisible {
                prop: self.name().to_string(),
                visible,
            },
            Effect::SetCollidable {
                prop: self.name().to_string(),
                collidable: visible,
            },
        ]
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

impl AltarListener for Chest {
    fn on_altar_event(&mut self, _event: AltarEvent, altars: &AltarStates, out: &mut Reactions) {
        let mut effects = Vec::new();
        self.sync(altars, &mut effects);
        out.extend(effects);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChestPhase {
    Opening,
    Glowing,
    Settled,
}

/// Open clip, then key overlay with the glow clip, then music restored.
/// The player stays frozen until the key is confirmed.
#[derive(Debug)]
pub struct ChestOpenSequence {
    prop: String,
    token: CancellationToken,
    phase: ChestPhase,
    wait: Countdown,
    glow_length: f32,
    awaiting_key: bool,
    released: bool,
    music_ducked: bool,
}

impl ChestOpenSequence {
    /// Start in `slot`, cancelling any sequence already running there.
    pub fn start(
        prop: &str,
        slot: &mut SequenceSlot,
        settings: &EngineSettings,
        out: &mut Vec<Effect>,
    ) -> Self {
        out.push(Effect::SetPlayerFrozen(true));
        out.push(Effect::SetMusicVolume(settings.chest_music_volume));
        out.push(Effect::clip(prop, Cue::ChestOpen));
        Self {
            prop: prop.to_string(),
            token: slot.begin(),
            phase: ChestPhase::Opening,
            wait: Countdown::new(settings.clips.chest_open),
            glow_length: settings.clips.chest_glow,
            awaiting_key: false,
            released: false,
            music_ducked: true,
        }
    }

    pub fn tick(&mut self, dt: f32, out: &mut Vec<Effect>) {
        if self.token.is_cancelled() {
            self.release(out);
            return;
        }
        match self.phase {
            ChestPhase::Opening => {
                if self.wait.tick(dt) {
                    out.push(Effect::ShowKeyOverlay);
                    out.push(Effect::clip(&self.prop, Cue::ChestGlow));
                    self.awaiting_key = true;
                    self.phase = ChestPhase::Glowing;
                    self.wait = Countdown::new(self.glow_length);
                }
            }
            ChestPhase::Glowing => {
                if self.wait.tick(dt) {
                    self.restore_music(out);
                    self.phase = ChestPhase::Settled;
                }
            }
            ChestPhase::Settled => {}
        }
    }

    /// The player acknowledged the key overlay. Ignored before it shows.
    pub fn confirm_key(&mut self, out: &mut Vec<Effect>) -> bool {
        if !self.awaiting_key {
            return false;
        }
        self.awaiting_key = false;
        self.released = true;
        out.push(Effect::HideKeyOverlay);
        out.push(Effect::ShowInventoryKey);
        out.push(Effect::SetPlayerFrozen(false));
        true
    }

    pub fn is_awaiting_key(&self) -> bool {
        self.awaiting_key
    }

    /// Movement stays blocked from the first frame until the key is taken.
    pub fn freezes_player(&self) -> bool {
        !self.released && !self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.token.is_cancelled() || (self.phase == ChestPhase::Settled && self.released)
    }

    /// Cancel now and hand back whatever the sequence still holds: music,
    /// the key overlay and the player.
    pub fn stop(&mut self, out: &mut Vec<Effect>) {
        self.token.cancel();
        self.release(out);
    }

    fn release(&mut self, out: &mut Vec<Effect>) {
        if self.phase != ChestPhase::Settled || !self.released {
            self.abandon(out);
        }
    }

    fn abandon(&mut self, out: &mut Vec<Effect>) {
        self.restore_music(out);
        if self.awaiting_key {
            self.awaiting_key = false;
            out.push(Effect::HideKeyOverlay);
        }
        if !self.released {
            self.released = true;
            out.push(Effect::SetPlayerFrozen(false));
        }
        self.phase = ChestPhase::Settled;
    }

    fn restore_music(&mut self, out: &mut Vec<Effect>) {
        if self.music_ducked {
            self.music_ducked = false;
            out.push(Effect::RestoreMusicVolume);
        }
    }
}
