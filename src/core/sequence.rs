/// Building blocks for tick-driven timed sequences.

// Clones share one flag. Cancelling and polling need no runtime.
pub use tokio_util::sync::CancellationToken;

/// A wait measured in seconds of game time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    remaining: f32,
}

impl Countdown {
    pub fn new(seconds: f32) -> Self {
        Self {
            remaining: seconds.max(0.0),
        }
    }

    /// Advance by `dt`. Returns true once the wait is over.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.remaining = (self.remaining - dt.max(0.0)).max(0.0);
        self.is_finished()
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining <= 0.0
    }
}

/// One slot per kind of sequence. Starting a new sequence cancels the
/// token of the one before it.
#[derive(Debug, Default)]
pub struct SequenceSlot {
    current: Option<CancellationToken>,
}

impl SequenceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> CancellationToken {
        self.cancel();
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        token
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.current.as_ref().is_some_and(|t| !t.is_cancelled())
    }
}
