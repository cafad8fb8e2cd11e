use crate::core::registry::{AltarListener, AltarStates, Reactions};
use crate::schema::altar::{AltarEvent, AltarId};
use crate::schema::config::PillarConfig;
use crate::schema::effect::{Cue, Effect};

/// Glows while its altar is awakened.
#[derive(Debug, Clone)]
pub struct GlowPillar {
    name: String,
    altar: AltarId,
    glowing: bool,
}

impl GlowPillar {
    pub fn from_config(config: &PillarConfig) -> Self {
        Self {
            name: config.name.clone(),
            altar: config.altar,
            glowing: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_glowing(&self) -> bool {
        self.glowing
    }

    pub fn reset(&mut self) {
        self.glowing = false;
    }

    pub fn spawn_effects(&self) -> Vec<Effect> {
        vec![Effect::SetGlow {
            prop: self.name.clone(),
            glowing: false,
        }]
    }
}

impl AltarListener for GlowPillar {
    fn on_altar_event(&mut self, event: AltarEvent, _altars: &AltarStates, out: &mut Reactions) {
        if event.altar() != self.altar {
            return;
        }
        self.glowing = event.is_awakened();
        out.push(Effect::SetGlow {
            prop: self.name.clone(),
            glowing: self.glowing,
        });
    }
}

/// Plays the glow cue when its altar awakens.
#[derive(Debug, Clone)]
pub struct GlowAudio {
    prop: String,
    altar: AltarId,
}

impl GlowAudio {
    pub fn new(prop: &str, altar: AltarId) -> Self {
        Self {
            prop: prop.to_string(),
            altar,
        }
    }
}

impl AltarListener for GlowAudio {
    fn on_altar_event(&mut self, event: AltarEvent, _altars: &AltarStates, out: &mut Reactions) {
        if event == AltarEvent::Awakened(self.altar) {
            out.push(Effect::clip(&self.prop, Cue::AltarGlow));
        }
    }
}
