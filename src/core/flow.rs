/// Scene flow: delayed scene loads, the transition scene, and the pause
/// menu.
///
/// Nothing here loads a scene. Each piece ends by queueing
/// `Effect::LoadScene` for the host.

use log::{debug, info};

use crate::core::dialogue::DialogueSequencer;
use crate::core::sequence::{CancellationToken, Countdown, SequenceSlot};
use crate::schema::config::{EngineSettings, TransitionConfig};
use crate::schema::effect::{Cue, Effect};

pub const MAIN_MENU_SCENE: &str = "Main Menu";

/// Waits for a clip to finish, then asks for a scene.
#[derive(Debug)]
pub struct SceneChange {
    token: CancellationToken,
    wait: Countdown,
    scene: String,
    stop_music: bool,
    restore_time_scale: bool,
    fired: bool,
}

impl SceneChange {
    pub fn start(slot: &mut SequenceSlot, scene: &str, delay: f32) -> Self {
        Self {
            token: slot.begin(),
            wait: Countdown::new(delay),
            scene: scene.to_string(),
            stop_music: false,
            restore_time_scale: false,
            fired: false,
        }
    }

    pub fn stopping_music(mut self) -> Self {
        self.stop_music = true;
        self
    }

    pub fn restoring_time_scale(mut self) -> Self {
        self.restore_time_scale = true;
        self
    }

    pub fn scene(&self) -> &str {
        &self.scene
    }

    /// Returns true on the tick the load is requested.
    pub fn tick(&mut self, dt: f32, out: &mut Vec<Effect>) -> bool {
        if self.fired || self.token.is_cancelled() || !self.wait.tick(dt) {
            return false;
        }
        self.fired = true;
        if self.restore_time_scale {
            out.push(Effect::SetTimeScale(1.0));
        }
        if self.stop_music {
            out.push(Effect::StopMusic);
        }
        info!("loading scene '{}'", self.scene);
        out.push(Effect::LoadScene(self.scene.clone()));
        true
    }

    pub fn is_finished(&self) -> bool {
        self.fired || self.token.is_cancelled()
    }
}

/// The scene between stages: shows its message at once, then moves on
/// after a fixed time or when skipped.
#[derive(Debug)]
pub struct TransitionScene {
    config: TransitionConfig,
    token: CancellationToken,
    display: Countdown,
    finished: bool,
}

impl TransitionScene {
    pub fn start(
        config: &TransitionConfig,
        settings: &EngineSettings,
        slot: &mut SequenceSlot,
        dialogue: &mut DialogueSequencer,
        out: &mut Vec<Effect>,
    ) -> Self {
        dialogue.force_show(&config.message);
        out.push(Effect::PlayClip {
            prop: None,
            cue: Cue::Transition,
        });
        Self {
            config: config.clone(),
            token: slot.begin(),
            display: Countdown::new(settings.transition_display_time),
            finished: false,
        }
    }

    pub fn tick(&mut self, dt: f32, dialogue: &mut DialogueSequencer, out: &mut Vec<Effect>) {
        if self.finished || self.token.is_cancelled() {
            return;
        }
        dialogue.tick(dt);
        if self.display.tick(dt) {
            self.finish(dialogue, out);
        }
    }

    /// Skip straight to the next scene.
    pub fn skip(&mut self, dialogue: &mut DialogueSequencer, out: &mut Vec<Effect>) {
        if !self.finished && !self.token.is_cancelled() {
            debug!("transition skipped");
            self.finish(dialogue, out);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn next_scene(&self) -> &str {
        &self.config.next_scene
    }

    fn finish(&mut self, dialogue: &mut DialogueSequencer, out: &mut Vec<Effect>) {
        self.finished = true;
        dialogue.hide_immediate();
        out.push(Effect::LoadScene(self.config.next_scene.clone()));
    }
}

/// In-stage pause menu. Button actions wait for the click clip in real
/// time, since game time is frozen while paused.
#[derive(Debug)]
pub struct PauseMenu {
    paused: bool,
    click_length: f32,
    slot: SequenceSlot,
    pending: Option<SceneChange>,
}

impl PauseMenu {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            paused: false,
            click_length: settings.clips.button_click,
            slot: SequenceSlot::new(),
            pending: None,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// A scene load is queued behind a button click.
    pub fn is_leaving(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.is_finished())
    }

    pub fn pause(&mut self, out: &mut Vec<Effect>) {
        if self.paused {
            return;
        }
        self.paused = true;
        out.push(Effect::SetPauseMenuVisible(true));
        out.push(Effect::SetTimeScale(0.0));
    }

    pub fn resume(&mut self, out: &mut Vec<Effect>) {
        if !self.paused || self.is_leaving() {
            return;
        }
        self.paused = false;
        out.push(button_click());
        out.push(Effect::SetPauseMenuVisible(false));
        out.push(Effect::SetTimeScale(1.0));
    }

    /// Reload `current_scene` after the click.
    pub fn restart(&mut self, current_scene: &str, out: &mut Vec<Effect>) {
        out.push(button_click());
        self.pending = Some(
            SceneChange::start(&mut self.slot, current_scene, self.click_length)
                .restoring_time_scale(),
        );
    }

    /// Stop the music and go to the main menu after the click.
    pub fn main_menu(&mut self, out: &mut Vec<Effect>) {
        out.push(button_click());
        self.pending = Some(
            SceneChange::start(&mut self.slot, MAIN_MENU_SCENE, self.click_length)
                .restoring_time_scale()
                .stopping_music(),
        );
    }

    /// Advance with unscaled time.
    pub fn tick_realtime(&mut self, dt: f32, out: &mut Vec<Effect>) {
        if let Some(pending) = self.pending.as_mut() {
            if pending.tick(dt, out) {
                self.paused = false;
            }
        }
    }
}

fn button_click() -> Effect {
    Effect::PlayClip {
        prop: None,
        cue: Cue::ButtonClick,
    }
}
