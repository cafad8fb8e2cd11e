/// Effects: requests the core hands to the presentation layer.
///
/// The core never renders, plays audio or loads scenes itself. Every
/// visible or audible consequence of a state change is queued as an
/// `Effect` and drained by whoever owns the engine loop.

use serde::{Deserialize, Serialize};

/// One-shot audio cues. Fire and forget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cue {
    AltarGlow,
    DoorOpen,
    DoorLocked,
    ChestOpen,
    ChestGlow,
    StageComplete,
    ButtonClick,
    Transition,
}

impl Cue {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AltarGlow => "altar_glow",
            Self::DoorOpen => "door_open",
            Self::DoorLocked => "door_locked",
            Self::ChestOpen => "chest_open",
            Self::ChestGlow => "chest_glow",
            Self::StageComplete => "stage_complete",
            Self::ButtonClick => "button_click",
            Self::Transition => "transition",
        }
    }
}

/// A request for an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Routed to the dialogue sequencer by the stage; never reaches the outbox.
    ShowDialogue(String),
    SetVisible { prop: String, visible: bool },
    SetCollidable { prop: String, collidable: bool },
    SetDoorOpen { prop: String, open: bool },
    SetChestOpen { prop: String, open: bool },
    /// Altar rune target alpha: lit = 1.0, unlit = 0.0.
    SetRunesLit { prop: String, lit: bool },
    SetGlow { prop: String, glowing: bool },
    SetHighlight { prop: String, highlighted: bool },
    PlayClip { prop: Option<String>, cue: Cue },
    SetMusicVolume(f32),
    RestoreMusicVolume,
    StopMusic,
    ShowKeyOverlay,
    HideKeyOverlay,
    ShowInventoryKey,
    SetPlayerFrozen(bool),
    SetTimerUiVisible(bool),
    /// New-best highlight on the best time label, toggled by the flash sequence.
    HighlightBestTime(bool),
    ShowCongratulations { time: f32, best: Option<f32> },
    SetPauseMenuVisible(bool),
    SetTimeScale(f32),
    LoadScene(String),
}

impl Effect {
    pub fn clip(prop: &str, cue: Cue) -> Self {
        Self::PlayClip {
            prop: Some(prop.to_string()),
            cue,
        }
    }

    /// The prop this effect targets, if any.
    pub fn prop(&self) -> Option<&str> {
        match self {
            Self::SetVisible { prop, .. }
            | Self::SetCollidable { prop, .. }
            | Self::SetDoorOpen { prop, .. }
            | Self::SetChestOpen { prop, .. }
            | Self::SetRunesLit { prop, .. }
            | Self::SetGlow { prop, .. }
            | Self::SetHighlight { prop, .. } => Some(prop),
            Self::PlayClip { prop, .. } => prop.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_helper_targets_prop() {
        let effect = Effect::clip("north_door", Cue::DoorOpen);
        assert_eq!(effect.prop(), Some("north_door"));
        assert!(matches!(effect, Effect::PlayClip { cue: Cue::DoorOpen, .. }));
    }

    #[test]
    fn global_effects_have_no_prop() {
        assert_eq!(Effect::StopMusic.prop(), None);
        assert_eq!(Effect::SetMusicVolume(0.3).prop(), None);
        assert_eq!(
            Effect::PlayClip {
                prop: None,
                cue: Cue::Transition
            }
            .prop(),
            None
        );
    }

    #[test]
    fn cue_names() {
        assert_eq!(Cue::ChestGlow.name(), "chest_glow");
        assert_eq!(Cue::DoorLocked.name(), "door_locked");
    }
}
