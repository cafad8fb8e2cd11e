/// Dialogue sequencing: one dialogue box, a typewriter reveal, and the
/// bookkeeping props use to show their awaken messages at most once.
///
/// The sequencer only tracks state. Whoever renders the box reads
/// `visible_text()` each frame.

use log::{debug, warn};

use crate::core::sequence::{CancellationToken, SequenceSlot};
use crate::schema::config::EngineSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogueState {
    #[default]
    Hidden,
    Typing,
    WaitingForDismissal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Another dialogue is already visible.
    Busy,
    /// The previous show or dismiss was too recent.
    Cooldown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    Shown,
    Dropped(DropReason),
}

impl ShowOutcome {
    pub fn was_shown(&self) -> bool {
        matches!(self, Self::Shown)
    }
}

#[derive(Debug)]
pub struct DialogueSequencer {
    state: DialogueState,
    message: String,
    /// Typewriter steps taken. Step `n` reveals `n` characters; one extra
    /// step past the end is spent before the box can be dismissed.
    steps: usize,
    char_count: usize,
    step_timer: f32,
    interval: f32,
    typewriter_enabled: bool,
    cooldown: f32,
    now: f32,
    last_interaction: Option<f32>,
    typewriter: SequenceSlot,
    token: Option<CancellationToken>,
}

impl Default for DialogueSequencer {
    fn default() -> Self {
        Self::new(&EngineSettings::default())
    }
}

impl DialogueSequencer {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            state: DialogueState::Hidden,
            message: String::new(),
            steps: 0,
            char_count: 0,
            step_timer: 0.0,
            interval: settings.typewriter_interval.max(0.0),
            typewriter_enabled: settings.typewriter_enabled && settings.typewriter_interval > 0.0,
            cooldown: settings.dialogue_cooldown.max(0.0),
            now: 0.0,
            last_interaction: None,
            typewriter: SequenceSlot::new(),
            token: None,
        }
    }

    pub fn state(&self) -> DialogueState {
        self.state
    }

    pub fn is_showing(&self) -> bool {
        self.state != DialogueState::Hidden
    }

    /// True while the reveal is still running. Movement is held during
    /// this window.
    pub fn is_typing(&self) -> bool {
        self.state == DialogueState::Typing
    }

    pub fn can_dismiss(&self) -> bool {
        self.state == DialogueState::WaitingForDismissal && self.cooldown_elapsed()
    }

    /// Full text of the current dialogue, empty when hidden.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The part of the message revealed so far.
    pub fn visible_text(&self) -> &str {
        match self.state {
            DialogueState::Hidden => "",
            DialogueState::WaitingForDismissal => &self.message,
            DialogueState::Typing => {
                let end = self
                    .message
                    .char_indices()
                    .nth(self.steps)
                    .map_or(self.message.len(), |(i, _)| i);
                &self.message[..end]
            }
        }
    }

    /// Request a dialogue. Dropped, not queued, when busy or cooling down.
    pub fn show(&mut self, message: &str) -> ShowOutcome {
        if self.is_showing() {
            warn!("dialogue dropped while busy: {:?}", message);
            return ShowOutcome::Dropped(DropReason::Busy);
        }
        if !self.cooldown_elapsed() {
            debug!("dialogue dropped during cooldown: {:?}", message);
            return ShowOutcome::Dropped(DropReason::Cooldown);
        }

        self.last_interaction = Some(self.now);
        self.message = message.to_string();
        self.char_count = self.message.chars().count();
        self.steps = 0;
        self.step_timer = 0.0;

        if self.typewriter_enabled {
            self.token = Some(self.typewriter.begin());
            self.state = DialogueState::Typing;
        } else {
            self.state = DialogueState::WaitingForDismissal;
        }
        debug!("dialogue shown: {:?}", self.message);
        ShowOutcome::Shown
    }

    /// Replace whatever is showing with the full message at once. Skips
    /// the typewriter and clears the cooldown.
    pub fn force_show(&mut self, message: &str) {
        self.typewriter.cancel();
        self.token = None;
        self.last_interaction = None;
        self.message = message.to_string();
        self.char_count = self.message.chars().count();
        self.steps = self.char_count;
        self.step_timer = 0.0;
        self.state = DialogueState::WaitingForDismissal;
        debug!("dialogue force shown: {:?}", self.message);
    }

    /// Advance the typewriter.
    pub fn tick(&mut self, dt: f32) {
        self.now += dt.max(0.0);
        if self.state != DialogueState::Typing {
            return;
        }
        if self.token.as_ref().map_or(true, |t| t.is_cancelled()) {
            self.finish_typing();
            return;
        }

        self.step_timer += dt.max(0.0);
        while self.step_timer >= self.interval {
            self.step_timer -= self.interval;
            self.steps += 1;
            if self.steps > self.char_count {
                self.finish_typing();
                return;
            }
        }
    }

    /// Close the box. Ignored while typing or during the cooldown.
    pub fn dismiss(&mut self) -> bool {
        if !self.can_dismiss() {
            return false;
        }
        self.last_interaction = Some(self.now);
        self.clear();
        true
    }

    /// Close without any checks, e.g. on scene change.
    pub fn hide_immediate(&mut self) {
        self.typewriter.cancel();
        self.token = None;
        self.clear();
    }

    fn finish_typing(&mut self) {
        self.steps = self.char_count;
        self.token = None;
        self.state = DialogueState::WaitingForDismissal;
    }

    fn clear(&mut self) {
        self.state = DialogueState::Hidden;
        self.message.clear();
        self.steps = 0;
        self.char_count = 0;
        self.step_timer = 0.0;
    }

    fn cooldown_elapsed(&self) -> bool {
        self.last_interaction
            .map_or(true, |at| self.now - at >= self.cooldown)
    }
}

/// Pick the awaken message for the current chain count (1-based).
/// Counts with no matching message fall back to the first one.
pub fn select_chain_message(messages: &[String], chain_count: usize) -> Option<&str> {
    chain_count
        .checked_sub(1)
        .and_then(|i| messages.get(i))
        .or_else(|| messages.first())
        .map(String::as_str)
}

/// At-most-once flag for a prop's dialogue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DialogueLatch {
    fired: bool,
}

impl DialogueLatch {
    /// Returns true the first time only.
    pub fn try_fire(&mut self) -> bool {
        !std::mem::replace(&mut self.fired, true)
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn reset(&mut self) {
        self.fired = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequencer() -> DialogueSequencer {
        DialogueSequencer::new(&EngineSettings::default())
    }

    #[test]
    fn second_show_is_dropped_while_busy() {
        let mut dialogue = sequencer();
        assert_eq!(dialogue.show("A"), ShowOutcome::Shown);
        assert_eq!(dialogue.show("B"), ShowOutcome::Dropped(DropReason::Busy));
        assert_eq!(dialogue.message(), "A");
    }

    #[test]
    fn force_show_replaces_immediately() {
        let mut dialogue = sequencer();
        dialogue.show("A long message");
        dialogue.tick(0.05);
        dialogue.force_show("C");
        assert_eq!(dialogue.state(), DialogueState::WaitingForDismissal);
        assert_eq!(dialogue.visible_text(), "C");
        assert!(dialogue.can_dismiss());
    }

    #[test]
    fn typewriter_reveals_one_char_per_interval() {
        let mut dialogue = sequencer();
        dialogue.show("Hey");
        assert_eq!(dialogue.visible_text(), "");
        dialogue.tick(0.05);
        assert_eq!(dialogue.visible_text(), "H");
        dialogue.tick(0.05);
        assert_eq!(dialogue.visible_text(), "He");
        dialogue.tick(0.05);
        assert_eq!(dialogue.visible_text(), "Hey");
        assert!(dialogue.is_typing());
        dialogue.tick(0.05);
        assert_eq!(dialogue.state(), DialogueState::WaitingForDismissal);
    }

    #[test]
    fn large_tick_finishes_typing() {
        let mut dialogue = sequencer();
        dialogue.show("Runes glow");
        dialogue.tick(10.0);
        assert_eq!(dialogue.state(), DialogueState::WaitingForDismissal);
        assert_eq!(dialogue.visible_text(), "Runes glow");
    }

    #[test]
    fn multibyte_text_reveals_on_char_boundaries() {
        let mut dialogue = sequencer();
        dialogue.show("ñé");
        dialogue.tick(0.05);
        assert_eq!(dialogue.visible_text(), "ñ");
    }

    #[test]
    fn dismiss_ignored_while_typing() {
        let mut dialogue = sequencer();
        dialogue.show("Hello there");
        dialogue.tick(0.1);
        assert!(!dialogue.dismiss());
        assert!(dialogue.is_showing());
    }

    #[test]
    fn dismiss_respects_cooldown() {
        let mut dialogue = sequencer();
        dialogue.show("Hi");
        dialogue.tick(0.3);
        assert_eq!(dialogue.state(), DialogueState::WaitingForDismissal);
        assert!(!dialogue.dismiss());
        dialogue.tick(0.25);
        assert!(dialogue.dismiss());
        assert_eq!(dialogue.state(), DialogueState::Hidden);
        assert_eq!(dialogue.visible_text(), "");
    }

    #[test]
    fn show_right_after_dismiss_hits_cooldown() {
        let mut dialogue = sequencer();
        dialogue.show("Hi");
        dialogue.tick(1.0);
        assert!(dialogue.dismiss());
        assert_eq!(
            dialogue.show("Again"),
            ShowOutcome::Dropped(DropReason::Cooldown)
        );
        dialogue.tick(0.5);
        assert!(dialogue.show("Again").was_shown());
    }

    #[test]
    fn disabled_typewriter_shows_full_text() {
        let settings = EngineSettings {
            typewriter_enabled: false,
            ..EngineSettings::default()
        };
        let mut dialogue = DialogueSequencer::new(&settings);
        dialogue.show("Instant");
        assert_eq!(dialogue.visible_text(), "Instant");
        assert_eq!(dialogue.state(), DialogueState::WaitingForDismissal);
    }

    #[test]
    fn hide_immediate_ignores_state() {
        let mut dialogue = sequencer();
        dialogue.show("Typing...");
        dialogue.hide_immediate();
        assert!(!dialogue.is_showing());
    }

    #[test]
    fn chain_message_selection() {
        let messages: Vec<String> = ["first", "second", "third"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(select_chain_message(&messages, 1), Some("first"));
        assert_eq!(select_chain_message(&messages, 3), Some("third"));
        assert_eq!(select_chain_message(&messages, 4), Some("first"));
        assert_eq!(select_chain_message(&messages, 0), Some("first"));
        assert_eq!(select_chain_message(&[], 1), None);
    }

    #[test]
    fn latch_fires_once_until_reset() {
        let mut latch = DialogueLatch::default();
        assert!(latch.try_fire());
        assert!(!latch.try_fire());
        assert!(latch.has_fired());
        latch.reset();
        assert!(latch.try_fire());
    }
}
