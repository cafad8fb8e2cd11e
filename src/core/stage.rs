/// The stage: one play session of one stage, wiring the altar registry,
/// props, dialogue box, clock, and scene flow together.
///
/// Callers drive it with trigger/interaction calls and `tick(dt)`, then
/// drain the queued effects for the presentation layer.

use log::{debug, info};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

use crate::core::clock::{BestTimeFlash, StageClock};
use crate::core::dialogue::{DialogueSequencer, ShowOutcome};
use crate::core::flow::{PauseMenu, SceneChange};
use crate::core::registry::{AltarRegistry, Dispatch, SubscriptionId};
use crate::core::scores::{HighScores, RecordOutcome, ScoreError, ScoreStore};
use crate::core::sequence::SequenceSlot;
use crate::props::altar::AltarProp;
use crate::props::chest::{Chest, ChestOpenSequence};
use crate::props::door::{AltarDoor, KeyDoor};
use crate::props::pillar::{GlowAudio, GlowPillar};
use crate::props::sign::Sign;
use crate::schema::altar::AltarId;
use crate::schema::config::{CompletionConfig, ConfigError, EngineSettings, StageConfig};
use crate::schema::effect::{Cue, Effect};
use crate::schema::gate::GateRequirement;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("score error: {0}")]
    Score(#[from] ScoreError),
    #[error("no stage config provided")]
    MissingConfig,
    #[error("no prop named '{0}' in this stage")]
    UnknownProp(String),
    #[error("no altar with id {0} in this stage")]
    UnknownAltar(AltarId),
}

/// How a stage ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub time: f32,
    /// `None` when the clock was never running.
    pub record: Option<RecordOutcome>,
    pub best: Option<f32>,
}

/// One stage session. Built via `Stage::builder()`.
pub struct Stage {
    config: StageConfig,
    settings: EngineSettings,
    registry: AltarRegistry,
    altars: Vec<AltarProp>,
    altar_doors: Vec<Rc<RefCell<AltarDoor>>>,
    key_doors: Vec<KeyDoor>,
    chests: Vec<Rc<RefCell<Chest>>>,
    pillars: Vec<Rc<RefCell<GlowPillar>>>,
    signs: Vec<Sign>,
    subscriptions: FxHashMap<String, Vec<SubscriptionId>>,
    dialogue: DialogueSequencer,
    last_dialogue: Option<ShowOutcome>,
    clock: StageClock,
    scores: HighScores,
    pause_menu: PauseMenu,
    chest_slot: SequenceSlot,
    chest_sequence: Option<ChestOpenSequence>,
    flash_slot: SequenceSlot,
    flash: Option<BestTimeFlash>,
    exit_slot: SequenceSlot,
    exit: Option<SceneChange>,
    completion: Option<Completion>,
    frozen_by_completion: bool,
    has_key: bool,
    now: f32,
    outbox: Vec<Effect>,
}

/// Builder for constructing a `Stage`.
pub struct StageBuilder {
    config_path: Option<String>,
    settings_path: Option<String>,
    /// Directly provided config (for testing without files).
    config: Option<StageConfig>,
    /// Directly provided settings (for testing without files).
    settings: Option<EngineSettings>,
    scores: Option<HighScores>,
}

impl StageBuilder {
    pub fn config_file(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    pub fn settings_file(mut self, path: &str) -> Self {
        self.settings_path = Some(path.to_string());
        self
    }

    pub fn with_config(mut self, config: StageConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Persist best times in `store`. Defaults to an in-memory store.
    pub fn with_store(mut self, store: impl ScoreStore + 'static) -> Self {
        self.scores = Some(HighScores::new(store));
        self
    }

    pub fn build(self) -> Result<Stage, StageError> {
        let settings = match (self.settings, self.settings_path) {
            (Some(settings), _) => settings,
            (None, Some(path)) => EngineSettings::load_from_ron(Path::new(&path))?,
            (None, None) => EngineSettings::default(),
        };
        let config = match (self.config, self.config_path) {
            (Some(config), _) => {
                config.validate()?;
                config
            }
            (None, Some(path)) => StageConfig::load_from_ron(Path::new(&path))?,
            (None, None) => return Err(StageError::MissingConfig),
        };
        Ok(Stage::assemble(
            config,
            settings,
            self.scores.unwrap_or_default(),
        ))
    }
}

impl Stage {
    pub fn builder() -> StageBuilder {
        StageBuilder {
            config_path: None,
            settings_path: None,
            config: None,
            settings: None,
            scores: None,
        }
    }

    fn assemble(config: StageConfig, settings: EngineSettings, scores: HighScores) -> Stage {
        let mut registry = AltarRegistry::new();
        let mut subscriptions: FxHashMap<String, Vec<SubscriptionId>> = FxHashMap::default();
        let mut outbox = Vec::new();

        let altars: Vec<AltarProp> = config.altars.iter().map(AltarProp::from_config).collect();
        for altar in &altars {
            outbox.extend(altar.spawn_effects());
        }

        let mut altar_doors = Vec::new();
        for door_config in &config.altar_doors {
            let door = Rc::new(RefCell::new(AltarDoor::from_config(
                door_config,
                settings.door_interaction_cooldown,
            )));
            outbox.extend(door.borrow().spawn_effects());
            let id = registry.subscribe(Rc::clone(&door));
            subscriptions.entry(door_config.name.clone()).or_default().push(id);
            altar_doors.push(door);
        }

        let key_doors: Vec<KeyDoor> = config.key_doors.iter().map(KeyDoor::from_config).collect();
        for door in &key_doors {
            outbox.extend(door.spawn_effects());
        }

        let mut chests = Vec::new();
        for chest_config in &config.chests {
            let chest = Rc::new(RefCell::new(Chest::from_config(chest_config)));
            outbox.extend(chest.borrow().spawn_effects());
            let id = registry.subscribe(Rc::clone(&chest));
            subscriptions.entry(chest_config.name.clone()).or_default().push(id);
            chests.push(chest);
        }

        let mut pillars = Vec::new();
        for pillar_config in &config.pillars {
            let pillar = Rc::new(RefCell::new(GlowPillar::from_config(pillar_config)));
            outbox.extend(pillar.borrow().spawn_effects());
            let ids = subscriptions.entry(pillar_config.name.clone()).or_default();
            ids.push(registry.subscribe(Rc::clone(&pillar)));
            if pillar_config.glow_audio {
                ids.push(registry.subscribe(GlowAudio::new(&pillar_config.name, pillar_config.altar)));
            }
            pillars.push(pillar);
        }

        let signs = config.signs.iter().map(Sign::from_config).collect();

        let mut clock = StageClock::new(&config.name);
        if config.timer.start_on_load {
            clock.start();
            outbox.push(Effect::SetTimerUiVisible(true));
        }

        info!(
            "stage '{}' ready: {} altars, {} listeners",
            config.name,
            altars.len(),
            registry.subscriber_count()
        );

        Stage {
            dialogue: DialogueSequencer::new(&settings),
            pause_menu: PauseMenu::new(&settings),
            config,
            settings,
            registry,
            altars,
            altar_doors,
            key_doors,
            chests,
            pillars,
            signs,
            subscriptions,
            last_dialogue: None,
            clock,
            scores,
            chest_slot: SequenceSlot::new(),
            chest_sequence: None,
            flash_slot: SequenceSlot::new(),
            flash: None,
            exit_slot: SequenceSlot::new(),
            exit: None,
            completion: None,
            frozen_by_completion: false,
            has_key: false,
            now: 0.0,
            outbox,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &AltarRegistry {
        &self.registry
    }

    pub fn dialogue(&self) -> &DialogueSequencer {
        &self.dialogue
    }

    /// Outcome of the most recent dialogue request, shown or dropped.
    pub fn last_dialogue_outcome(&self) -> Option<ShowOutcome> {
        self.last_dialogue
    }

    pub fn clock(&self) -> &StageClock {
        &self.clock
    }

    pub fn scores(&self) -> &HighScores {
        &self.scores
    }

    pub fn scores_mut(&mut self) -> &mut HighScores {
        &mut self.scores
    }

    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    pub fn has_key(&self) -> bool {
        self.has_key
    }

    pub fn is_paused(&self) -> bool {
        self.pause_menu.is_paused()
    }

    /// Movement is held while dialogue types, while the chest sequence
    /// runs, and after the congratulations overlay.
    pub fn is_player_frozen(&self) -> bool {
        self.dialogue.is_typing()
            || self
                .chest_sequence
                .as_ref()
                .is_some_and(|s| s.freezes_player())
            || self.frozen_by_completion
    }

    /// Take every queued effect, in order.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.outbox)
    }

    // --- altars ---

    /// Something entered an altar's trigger volume.
    pub fn trigger_enter(&mut self, altar: AltarId, occupant: &str) -> Result<Dispatch, StageError> {
        let index = self.altar_index(altar)?;
        debug!("'{}' entered altar {}", occupant, altar);
        let dispatch = self.altars[index].on_enter(&mut self.registry);
        self.route(dispatch.effects.iter().cloned());
        Ok(dispatch)
    }

    /// Something left an altar's trigger volume.
    pub fn trigger_exit(&mut self, altar: AltarId, occupant: &str) -> Result<Dispatch, StageError> {
        let index = self.altar_index(altar)?;
        debug!("'{}' left altar {}", occupant, altar);
        let dispatch = self.altars[index].on_exit(&mut self.registry);
        self.route(dispatch.effects.iter().cloned());
        Ok(dispatch)
    }

    pub fn force_awaken(&mut self, altar: AltarId) -> Result<Dispatch, StageError> {
        let index = self.altar_index(altar)?;
        let dispatch = self.altars[index].force_awaken(&mut self.registry);
        self.route(dispatch.effects.iter().cloned());
        Ok(dispatch)
    }

    pub fn is_altar_awakened(&self, altar: AltarId) -> bool {
        self.registry.is_awakened(altar)
    }

    pub fn altar_has_shown_dialogue(&self, altar: AltarId) -> Result<bool, StageError> {
        let index = self.altar_index(altar)?;
        Ok(self.altars[index].has_shown_dialogue())
    }

    pub fn reset_altar_dialogue(&mut self, altar: AltarId) -> Result<(), StageError> {
        let index = self.altar_index(altar)?;
        self.altars[index].reset_dialogue_state();
        Ok(())
    }

    /// Show an altar's awaken dialogue now unless it was already shown.
    /// `None` when the altar had nothing left to say.
    pub fn trigger_altar_dialogue(
        &mut self,
        altar: AltarId,
    ) -> Result<Option<ShowOutcome>, StageError> {
        let index = self.altar_index(altar)?;
        let effect = self.altars[index].trigger_dialogue(&self.registry);
        Ok(self.route(effect))
    }

    /// Replace the chain messages used on the altar's next awaken.
    pub fn set_altar_messages(
        &mut self,
        altar: AltarId,
        messages: Vec<String>,
    ) -> Result<(), StageError> {
        let index = self.altar_index(altar)?;
        self.altars[index].set_messages(messages);
        Ok(())
    }

    /// How many things stand on the altar right now.
    pub fn altar_occupants(&self, altar: AltarId) -> Result<u32, StageError> {
        let index = self.altar_index(altar)?;
        Ok(self.altars[index].occupants())
    }

    // --- altar-sealed doors ---

    /// The player walked up to a sealed door.
    pub fn approach_door(&mut self, name: &str) -> Result<bool, StageError> {
        let door = self.altar_door(name)?;
        let mut effects = Vec::new();
        let handled = door
            .borrow_mut()
            .approach(self.now, self.registry.states(), &mut effects);
        self.route(effects);
        Ok(handled)
    }

    pub fn is_door_open(&self, name: &str) -> Result<bool, StageError> {
        Ok(self.altar_door(name)?.borrow().is_open())
    }

    pub fn door_status(&self, name: &str) -> Result<String, StageError> {
        Ok(self.altar_door(name)?.borrow().status(self.registry.states()))
    }

    pub fn force_open_door(&mut self, name: &str) -> Result<(), StageError> {
        let door = self.altar_door(name)?;
        let mut effects = Vec::new();
        door.borrow_mut().force_open(&mut effects);
        self.route(effects);
        Ok(())
    }

    pub fn force_close_door(&mut self, name: &str) -> Result<(), StageError> {
        let door = self.altar_door(name)?;
        let mut effects = Vec::new();
        door.borrow_mut().force_close(&mut effects);
        self.route(effects);
        Ok(())
    }

    /// Swap a door's requirement. Unknown altar ids are rejected.
    pub fn set_door_requirement(
        &mut self,
        name: &str,
        requirement: GateRequirement,
    ) -> Result<(), StageError> {
        if let Some(unknown) = requirement
            .altar_ids
            .iter()
            .find(|id| !self.altars.iter().any(|a| a.id() == **id))
        {
            return Err(StageError::UnknownAltar(*unknown));
        }
        let door = self.altar_door(name)?;
        door.borrow_mut().set_required_altars(requirement);
        Ok(())
    }

    pub fn reset_door_dialogue(&mut self, name: &str) -> Result<(), StageError> {
        self.altar_door(name)?.borrow_mut().reset_dialogue_states();
        Ok(())
    }

    // --- key doors ---

    pub fn set_key_door_nearby(&mut self, name: &str, nearby: bool) -> Result<(), StageError> {
        let index = self.key_door_index(name)?;
        let mut effects = Vec::new();
        self.key_doors[index].set_player_nearby(nearby, self.has_key, &mut effects);
        self.route(effects);
        Ok(())
    }

    /// Try the key on a locked door. Returns true if it opened.
    pub fn interact_key_door(&mut self, name: &str) -> Result<bool, StageError> {
        let index = self.key_door_index(name)?;
        let mut effects = Vec::new();
        let opened = self.key_doors[index].interact(self.has_key, &mut effects);
        self.route(effects);
        Ok(opened)
    }

    pub fn is_key_door_open(&self, name: &str) -> Result<bool, StageError> {
        let index = self.key_door_index(name)?;
        Ok(self.key_doors[index].is_open())
    }

    pub fn is_key_door_nearby(&self, name: &str) -> Result<bool, StageError> {
        let index = self.key_door_index(name)?;
        Ok(self.key_doors[index].is_player_nearby())
    }

    // --- chests ---

    pub fn set_chest_nearby(&mut self, name: &str, nearby: bool) -> Result<(), StageError> {
        let chest = self.chest(name)?;
        let mut effects = Vec::new();
        if nearby {
            chest.borrow_mut().enter_range(&mut effects);
        } else {
            chest.borrow_mut().exit_range(&mut effects);
        }
        self.route(effects);
        Ok(())
    }

    /// Open a revealed chest and start the key sequence.
    pub fn open_chest(&mut self, name: &str) -> Result<bool, StageError> {
        let chest = self.chest(name)?;
        let mut effects = Vec::new();
        if !chest.borrow_mut().try_open(&mut effects) {
            return Ok(false);
        }
        if let Some(mut previous) = self.chest_sequence.take() {
            previous.stop(&mut effects);
        }
        self.chest_sequence = Some(ChestOpenSequence::start(
            name,
            &mut self.chest_slot,
            &self.settings,
            &mut effects,
        ));
        effects.extend(chest.borrow_mut().take_open_dialogue());
        self.route(effects);
        Ok(true)
    }

    /// The player acknowledged the key overlay.
    pub fn confirm_key(&mut self) -> bool {
        let mut effects = Vec::new();
        let confirmed = self
            .chest_sequence
            .as_mut()
            .is_some_and(|s| s.confirm_key(&mut effects));
        if confirmed {
            info!("{}: key obtained", self.config.name);
            self.has_key = true;
        }
        self.route(effects);
        confirmed
    }

    /// The key overlay is up and waiting for `confirm_key`.
    pub fn is_awaiting_key(&self) -> bool {
        self.chest_sequence
            .as_ref()
            .is_some_and(|s| s.is_awaiting_key())
    }

    pub fn is_chest_visible(&self, name: &str) -> Result<bool, StageError> {
        Ok(self.chest(name)?.borrow().is_visible())
    }

    pub fn is_chest_open(&self, name: &str) -> Result<bool, StageError> {
        Ok(self.chest(name)?.borrow().is_open())
    }

    pub fn force_check_chest(&mut self, name: &str) -> Result<(), StageError> {
        let chest = self.chest(name)?;
        let mut effects = Vec::new();
        chest
            .borrow_mut()
            .force_check(self.registry.states(), &mut effects);
        self.route(effects);
        Ok(())
    }

    pub fn force_hide_chest(&mut self, name: &str) -> Result<(), StageError> {
        let chest = self.chest(name)?;
        let mut effects = Vec::new();
        chest.borrow_mut().force_hide(&mut effects);
        self.route(effects);
        Ok(())
    }

    pub fn reset_chest_dialogue(&mut self, name: &str) -> Result<(), StageError> {
        self.chest(name)?.borrow_mut().reset_dialogue_state();
        Ok(())
    }

    /// Show the chest's open dialogue again, even if it was shown before.
    pub fn trigger_chest_dialogue(
        &mut self,
        name: &str,
    ) -> Result<Option<ShowOutcome>, StageError> {
        let effect = self.chest(name)?.borrow().trigger_dialogue();
        Ok(self.route(effect))
    }

    pub fn chest_has_shown_dialogue(&self, name: &str) -> Result<bool, StageError> {
        Ok(self.chest(name)?.borrow().has_shown_open_dialogue())
    }

    // --- pillars and signs ---

    pub fn is_pillar_glowing(&self, name: &str) -> Result<bool, StageError> {
        self.pillars
            .iter()
            .find(|p| p.borrow().name() == name)
            .map(|p| p.borrow().is_glowing())
            .ok_or_else(|| StageError::UnknownProp(name.to_string()))
    }

    pub fn set_sign_nearby(&mut self, name: &str, nearby: bool) -> Result<(), StageError> {
        let index = self.sign_index(name)?;
        let mut effects = Vec::new();
        self.signs[index].set_player_nearby(nearby, &mut effects);
        self.route(effects);
        Ok(())
    }

    /// `None` for a blank sign.
    pub fn read_sign(&mut self, name: &str) -> Result<Option<ShowOutcome>, StageError> {
        let index = self.sign_index(name)?;
        let mut effects = Vec::new();
        self.signs[index].read(&mut effects);
        Ok(self.route(effects))
    }

    // --- dialogue ---

    pub fn dismiss_dialogue(&mut self) -> bool {
        self.dialogue.dismiss()
    }

    // --- time ---

    /// Advance everything by `dt` seconds of real time. Game time stands
    /// still while paused.
    pub fn tick(&mut self, dt: f32) {
        let mut effects = Vec::new();
        let paused = self.pause_menu.is_paused();
        self.pause_menu.tick_realtime(dt, &mut effects);
        let dt = if paused { 0.0 } else { dt };

        self.now += dt;
        self.clock.tick(dt);
        self.dialogue.tick(dt);

        if let Some(sequence) = self.chest_sequence.as_mut() {
            sequence.tick(dt, &mut effects);
            if sequence.is_finished() {
                self.chest_sequence = None;
            }
        }
        if let Some(flash) = self.flash.as_mut() {
            flash.tick(dt, &mut effects);
            if flash.is_finished() {
                self.flash = None;
            }
        }
        if let Some(exit) = self.exit.as_mut() {
            exit.tick(dt, &mut effects);
        }

        // Polling fallback: converges on the same state as event delivery.
        // Despawned props are left alone.
        let states = self.registry.states();
        for door in &self.altar_doors {
            let mut door = door.borrow_mut();
            if self.subscriptions.contains_key(door.name()) {
                door.sync(states, &mut effects);
            }
        }
        for chest in &self.chests {
            let mut chest = chest.borrow_mut();
            if self.subscriptions.contains_key(chest.name()) {
                chest.sync(states, &mut effects);
            }
        }

        self.route(effects);
    }

    // --- pause menu ---

    pub fn pause(&mut self) {
        let mut effects = Vec::new();
        self.pause_menu.pause(&mut effects);
        self.route(effects);
    }

    pub fn resume(&mut self) {
        let mut effects = Vec::new();
        self.pause_menu.resume(&mut effects);
        self.route(effects);
    }

    pub fn restart(&mut self) {
        let mut effects = Vec::new();
        self.pause_menu.restart(&self.config.name, &mut effects);
        self.route(effects);
    }

    pub fn main_menu(&mut self) {
        let mut effects = Vec::new();
        self.pause_menu.main_menu(&mut effects);
        self.route(effects);
    }

    // --- completion ---

    /// The player reached the exit. Fires once; later calls return `None`.
    pub fn complete(&mut self) -> Result<Option<Completion>, StageError> {
        if self.completion.is_some() {
            return Ok(None);
        }
        let record = self.clock.stop_and_record(&mut self.scores)?;
        let time = self.clock.elapsed();
        let best = self.scores.best(&self.config.name);

        let mut effects = Vec::new();
        if record.is_some_and(|r| r.is_new_best()) {
            let (flash, first) = BestTimeFlash::start(&mut self.flash_slot, &self.settings);
            effects.push(first);
            self.flash = Some(flash);
        }

        let complete_clip = Effect::PlayClip {
            prop: None,
            cue: Cue::StageComplete,
        };
        match &self.config.completion {
            CompletionConfig::Transition { scene } => {
                effects.push(complete_clip);
                self.exit = Some(
                    SceneChange::start(
                        &mut self.exit_slot,
                        scene,
                        self.settings.clips.stage_complete,
                    )
                    .stopping_music(),
                );
            }
            CompletionConfig::Congratulations => {
                self.frozen_by_completion = true;
                effects.push(Effect::SetTimerUiVisible(false));
                effects.push(Effect::SetPlayerFrozen(true));
                effects.push(Effect::StopMusic);
                effects.push(Effect::ShowCongratulations { time, best });
                effects.push(complete_clip);
            }
        }
        info!("stage '{}' complete in {:.3}s", self.config.name, time);
        self.route(effects);

        let completion = Completion { time, record, best };
        self.completion = Some(completion.clone());
        Ok(Some(completion))
    }

    // --- lifecycle ---

    /// Stop a prop from receiving altar events. Returns false if it was
    /// not subscribed (or already despawned).
    pub fn despawn(&mut self, name: &str) -> Result<bool, StageError> {
        if !self.config.prop_names().contains(&name) {
            return Err(StageError::UnknownProp(name.to_string()));
        }
        let Some(ids) = self.subscriptions.remove(name) else {
            return Ok(false);
        };
        let mut removed = false;
        for id in ids {
            removed |= self.registry.unsubscribe(id);
        }
        debug!("despawned '{}'", name);
        Ok(removed)
    }

    /// Tear the session down. Running sequences are stopped and queue
    /// whatever they still held (music, key overlay, player). The dialogue
    /// box is cleared, the registry forgets every altar and listener, and
    /// every prop goes back to its spawn state without emitting anything.
    pub fn end_session(&mut self) {
        let mut effects = Vec::new();
        if let Some(mut sequence) = self.chest_sequence.take() {
            sequence.stop(&mut effects);
        }
        if let Some(mut flash) = self.flash.take() {
            flash.stop(&mut effects);
        }
        self.chest_slot.cancel();
        self.flash_slot.cancel();
        self.exit_slot.cancel();
        self.exit = None;
        self.dialogue.hide_immediate();

        self.registry.reset();
        self.registry.clear_subscribers();
        self.subscriptions.clear();
        for altar in &mut self.altars {
            altar.reset();
        }
        for door in &self.altar_doors {
            door.borrow_mut().reset();
        }
        for door in &mut self.key_doors {
            door.reset();
        }
        for chest in &self.chests {
            chest.borrow_mut().reset();
        }
        for pillar in &self.pillars {
            pillar.borrow_mut().reset();
        }
        for sign in &mut self.signs {
            sign.reset();
        }
        self.has_key = false;

        self.route(effects);
        info!("stage '{}' session ended", self.config.name);
    }

    /// Dialogue requests go to the sequencer; everything else is queued.
    /// Returns the outcome of the last dialogue request in `effects`.
    fn route(&mut self, effects: impl IntoIterator<Item = Effect>) -> Option<ShowOutcome> {
        let mut outcome = None;
        for effect in effects {
            match effect {
                Effect::ShowDialogue(message) => {
                    let shown = self.dialogue.show(&message);
                    self.last_dialogue = Some(shown);
                    outcome = Some(shown);
                }
                other => self.outbox.push(other),
            }
        }
        outcome
    }

    fn altar_index(&self, id: AltarId) -> Result<usize, StageError> {
        self.altars
            .iter()
            .position(|a| a.id() == id)
            .ok_or(StageError::UnknownAltar(id))
    }

    fn altar_door(&self, name: &str) -> Result<Rc<RefCell<AltarDoor>>, StageError> {
        self.altar_doors
            .iter()
            .find(|d| d.borrow().name() == name)
            .cloned()
            .ok_or_else(|| StageError::UnknownProp(name.to_string()))
    }

    fn chest(&self, name: &str) -> Result<Rc<RefCell<Chest>>, StageError> {
        self.chests
            .iter()
            .find(|c| c.borrow().name() == name)
            .cloned()
            .ok_or_else(|| StageError::UnknownProp(name.to_string()))
    }

    fn key_door_index(&self, name: &str) -> Result<usize, StageError> {
        self.key_doors
            .iter()
            .position(|d| d.name() == name)
            .ok_or_else(|| StageError::UnknownProp(name.to_string()))
    }

    fn sign_index(&self, name: &str) -> Result<usize, StageError> {
        self.signs
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| StageError::UnknownProp(name.to_string()))
    }
}
