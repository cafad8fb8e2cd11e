/// Stage clock: elapsed play time for one stage and the new-best flash.
use log::{debug, info};

use crate::core::scores::{format_time, HighScores, RecordOutcome, ScoreError};
use crate::core::sequence::{CancellationToken, Countdown, SequenceSlot};
use crate::schema::config::EngineSettings;
use crate::schema::effect::Effect;

/// Elapsed-time accumulator. Advances only while running and not completed.
#[derive(Debug, Clone)]
pub struct StageClock {
    stage: String,
    elapsed: f32,
    running: bool,
    completed: bool,
}

impl StageClock {
    pub fn new(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            elapsed: 0.0,
            running: false,
            completed: false,
        }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Start from zero.
    pub fn start(&mut self) {
        self.elapsed = 0.0;
        self.running = true;
        self.completed = false;
        debug!("{}: clock started", self.stage);
    }

    /// Complete the stage. Returns the final time, or `None` if the clock
    /// was not running.
    pub fn stop(&mut self) -> Option<f32> {
        if !self.running {
            return None;
        }
        self.running = false;
        self.completed = true;
        info!("{}: clock stopped at {}", self.stage, format_time(self.elapsed, true));
        Some(self.elapsed)
    }

    /// Stop and record the final time as a best-time candidate.
    pub fn stop_and_record(
        &mut self,
        scores: &mut HighScores,
    ) -> Result<Option<RecordOutcome>, ScoreError> {
        match self.stop() {
            Some(time) => Ok(Some(scores.record(&self.stage, time)?)),
            None => Ok(None),
        }
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Ignored once the stage is completed.
    pub fn resume(&mut self) {
        if !self.completed {
            self.running = true;
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.running = false;
        self.completed = false;
    }

    pub fn tick(&mut self, dt: f32) {
        if self.running && !self.completed {
            self.elapsed += dt.max(0.0);
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// `Timer : mm:ss.mmm` label text.
    pub fn label(&self, show_milliseconds: bool) -> String {
        format!("Timer : {}", format_time(self.elapsed, show_milliseconds))
    }
}

/// Blinks the best-time label after a new record: highlight on, wait,
/// highlight off, wait, repeated.
#[derive(Debug)]
pub struct BestTimeFlash {
    token: CancellationToken,
    remaining_toggles: u32,
    highlighted: bool,
    interval: f32,
    wait: Countdown,
}

impl BestTimeFlash {
    /// Start a flash in `slot`, cancelling any flash already running there.
    /// The first highlight effect is returned alongside the sequence.
    pub fn start(slot: &mut SequenceSlot, settings: &EngineSettings) -> (Self, Effect) {
        let flash = Self {
            token: slot.begin(),
            remaining_toggles: settings.best_time_flashes.saturating_mul(2),
            highlighted: true,
            interval: settings.best_time_flash_interval,
            wait: Countdown::new(settings.best_time_flash_interval),
        };
        (flash, Effect::HighlightBestTime(true))
    }

    pub fn is_finished(&self) -> bool {
        self.remaining_toggles == 0 || self.token.is_cancelled()
    }

    /// Cancel now, leaving the label unhighlighted.
    pub fn stop(&mut self, out: &mut Vec<Effect>) {
        self.token.cancel();
        self.tick(0.0, out);
    }

    pub fn tick(&mut self, dt: f32, out: &mut Vec<Effect>) {
        if self.token.is_cancelled() {
            if self.highlighted {
                self.highlighted = false;
                out.push(Effect::HighlightBestTime(false));
            }
            self.remaining_toggles = 0;
            return;
        }
        if self.remaining_toggles == 0 || !self.wait.tick(dt) {
            return;
        }

        self.remaining_toggles -= 1;
        if self.remaining_toggles == 0 {
            if self.highlighted {
                self.highlighted = false;
                out.push(Effect::HighlightBestTime(false));
            }
            return;
        }
        self.highlighted = !self.highlighted;
        out.push(Effect::HighlightBestTime(self.highlighted));
        self.wait = Countdown::new(self.interval);
    }
}
