/// Stage and engine configuration: RON data, defaults, and validation.

use log::warn;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::altar::AltarId;
use super::gate::{GateMode, GateRequirement};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("stage name is empty")]
    EmptyStageName,
    #[error("prop name '{0}' is used more than once")]
    DuplicateProp(String),
    #[error("altar id {0} is declared more than once")]
    DuplicateAltar(AltarId),
    #[error("'{prop}' references altar {altar}, which no altar in the stage declares")]
    UnknownAltar { prop: String, altar: AltarId },
    #[error("'{prop}' has dialogue enabled but no message to show")]
    MissingMessage { prop: String },
}

fn default_true() -> bool {
    true
}

fn default_fixed_message() -> String {
    "This altar has been activated.".to_string()
}

fn default_chain_messages() -> Vec<String> {
    vec![
        "The first ancient altar awakens! Its runes glow with mystical energy...".to_string(),
        "Another altar responds! The magic grows stronger as two altars are now awakened..."
            .to_string(),
        "The final altar is awakened! All three altars now pulse with incredible power!"
            .to_string(),
    ]
}

fn default_sealed_approach() -> String {
    "This ancient door seems to be sealed by mystical forces. Perhaps an altar needs to be activated..."
        .to_string()
}

fn default_sealed_no_key() -> String {
    "The door remains sealed. The altar's power is needed to unlock this barrier.".to_string()
}

fn default_sealed_open() -> String {
    "The altar's energy flows through the door! The ancient seal is broken!".to_string()
}

fn default_locked_approach() -> String {
    "This door seems to be locked. You might need a key to open it.".to_string()
}

fn default_locked_no_key() -> String {
    "The door is locked tight. You need to find a key to open it.".to_string()
}

fn default_locked_open() -> String {
    "The key works! The door creaks open, revealing what lies beyond...".to_string()
}

fn default_chest_message() -> String {
    "Congratulations! You've awakened all the ancient altars and unlocked the mysterious chest!"
        .to_string()
}

fn default_altars_required() -> usize {
    3
}

fn default_transition_message() -> String {
    "Stage Complete! Moving to next area...".to_string()
}

fn default_next_scene() -> String {
    "Scene2".to_string()
}

fn default_sign_text() -> String {
    "Welcome to the adventure! Press F to interact with objects.".to_string()
}

/// An altar that awakens while something stands on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AltarConfig {
    pub name: String,
    pub id: AltarId,
    /// Once awakened, stepping off no longer deactivates the altar.
    #[serde(default = "default_true")]
    pub stay_awakened_once: bool,
    #[serde(default = "default_true")]
    pub show_dialogue_on_awaken: bool,
    /// Show `fixed_message` instead of the chain messages. Such altars do
    /// not count toward the awakened chain.
    #[serde(default)]
    pub lock_to_fixed_dialogue: bool,
    #[serde(default = "default_fixed_message")]
    pub fixed_message: String,
    /// Chain messages indexed by awakened chain count (first, second, ...).
    #[serde(default = "default_chain_messages")]
    pub messages: Vec<String>,
}

/// A door that opens by itself while its altar requirement holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AltarDoorConfig {
    pub name: String,
    #[serde(default)]
    pub required_altars: Vec<AltarId>,
    #[serde(default)]
    pub mode: GateMode,
    #[serde(default = "default_true")]
    pub show_first_approach: bool,
    #[serde(default = "default_sealed_approach")]
    pub first_approach_message: String,
    #[serde(default = "default_true")]
    pub show_no_key: bool,
    #[serde(default = "default_sealed_no_key")]
    pub no_key_message: String,
    #[serde(default = "default_true")]
    pub show_open: bool,
    #[serde(default = "default_sealed_open")]
    pub open_message: String,
}

impl AltarDoorConfig {
    pub fn requirement(&self) -> GateRequirement {
        GateRequirement::new(self.required_altars.clone(), self.mode)
    }
}

/// A plain locked door opened with the key from the chest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyDoorConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enable_dialogue: bool,
    #[serde(default = "default_locked_approach")]
    pub first_approach_message: String,
    #[serde(default = "default_locked_no_key")]
    pub no_key_message: String,
    #[serde(default = "default_locked_open")]
    pub open_message: String,
}

/// A chest that appears once enough chain altars are awakened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChestConfig {
    pub name: String,
    #[serde(default = "default_altars_required")]
    pub altars_required: usize,
    #[serde(default = "default_true")]
    pub show_dialogue_on_open: bool,
    #[serde(default = "default_chest_message")]
    pub open_message: String,
}

/// A pillar that glows while its altar is awakened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PillarConfig {
    pub name: String,
    pub altar: AltarId,
    /// Also play the glow cue when the altar awakens.
    #[serde(default)]
    pub glow_audio: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignConfig {
    pub name: String,
    #[serde(default = "default_sign_text")]
    pub text: String,
}

/// What happens when the player reaches the stage exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionConfig {
    /// Play the completion cue, then load `scene`.
    Transition { scene: String },
    /// Freeze the player and show the congratulations overlay.
    Congratulations,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self::Transition {
            scene: "TransitionScene".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_true")]
    pub start_on_load: bool,
    #[serde(default = "default_true")]
    pub show_milliseconds: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            start_on_load: true,
            show_milliseconds: true,
        }
    }
}

/// The in-between scene shown after a stage that ends in a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
    #[serde(default = "default_transition_message")]
    pub message: String,
    #[serde(default = "default_next_scene")]
    pub next_scene: String,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            message: default_transition_message(),
            next_scene: default_next_scene(),
        }
    }
}

impl TransitionConfig {
    pub fn load_from_ron(path: &Path) -> Result<TransitionConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<TransitionConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }
}

/// Everything a stage declares: its props and how it ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    #[serde(default)]
    pub altars: Vec<AltarConfig>,
    #[serde(default)]
    pub altar_doors: Vec<AltarDoorConfig>,
    #[serde(default)]
    pub key_doors: Vec<KeyDoorConfig>,
    #[serde(default)]
    pub chests: Vec<ChestConfig>,
    #[serde(default)]
    pub pillars: Vec<PillarConfig>,
    #[serde(default)]
    pub signs: Vec<SignConfig>,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub timer: TimerConfig,
}

impl StageConfig {
    /// An empty stage with defaults everywhere.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            altars: Vec::new(),
            altar_doors: Vec::new(),
            key_doors: Vec::new(),
            chests: Vec::new(),
            pillars: Vec::new(),
            signs: Vec::new(),
            completion: CompletionConfig::default(),
            timer: TimerConfig::default(),
        }
    }

    /// Load and validate a stage from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<StageConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse and validate a stage from a RON string.
    pub fn parse_ron(input: &str) -> Result<StageConfig, ConfigError> {
        let config: StageConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Every prop name in declaration order, grouped by kind.
    pub fn prop_names(&self) -> Vec<&str> {
        self.altars
            .iter()
            .map(|a| a.name.as_str())
            .chain(self.altar_doors.iter().map(|d| d.name.as_str()))
            .chain(self.key_doors.iter().map(|d| d.name.as_str()))
            .chain(self.chests.iter().map(|c| c.name.as_str()))
            .chain(self.pillars.iter().map(|p| p.name.as_str()))
            .chain(self.signs.iter().map(|s| s.name.as_str()))
            .collect()
    }

    /// Number of altars that count toward the awakened chain.
    pub fn chain_altar_count(&self) -> usize {
        self.altars
            .iter()
            .filter(|a| !a.lock_to_fixed_dialogue)
            .count()
    }

    /// Check cross-references. Configuration mistakes fail here rather
    /// than degrading silently at runtime.
    ///
    /// Empty door requirements and unreachable chest thresholds are legal
    /// (the gate simply never opens) and only produce warnings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyStageName);
        }

        let mut names = FxHashSet::default();
        for name in self.prop_names() {
            if !names.insert(name) {
                return Err(ConfigError::DuplicateProp(name.to_string()));
            }
        }

        let mut altar_ids = FxHashSet::default();
        for altar in &self.altars {
            if !altar_ids.insert(altar.id) {
                return Err(ConfigError::DuplicateAltar(altar.id));
            }
            if altar.show_dialogue_on_awaken {
                let missing = if altar.lock_to_fixed_dialogue {
                    altar.fixed_message.trim().is_empty()
                } else {
                    altar.messages.is_empty()
                };
                if missing {
                    return Err(ConfigError::MissingMessage {
                        prop: altar.name.clone(),
                    });
                }
            }
        }

        for door in &self.altar_doors {
            if door.required_altars.is_empty() {
                warn!(
                    "{}: door '{}' has no required altars and will never open",
                    self.name, door.name
                );
            }
            for altar in &door.required_altars {
                if !altar_ids.contains(altar) {
                    return Err(ConfigError::UnknownAltar {
                        prop: door.name.clone(),
                        altar: *altar,
                    });
                }
            }
        }

        for pillar in &self.pillars {
            if !altar_ids.contains(&pillar.altar) {
                return Err(ConfigError::UnknownAltar {
                    prop: pillar.name.clone(),
                    altar: pillar.altar,
                });
            }
        }

        let chain_altars = self.chain_altar_count();
        for chest in &self.chests {
            if chest.show_dialogue_on_open && chest.open_message.trim().is_empty() {
                return Err(ConfigError::MissingMessage {
                    prop: chest.name.clone(),
                });
            }
            if chest.altars_required > chain_altars {
                warn!(
                    "{}: chest '{}' needs {} chain altars but the stage only has {}",
                    self.name, chest.name, chest.altars_required, chain_altars
                );
            }
        }

        Ok(())
    }
}

/// Fixed clip lengths, in seconds, for sequences that wait on audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipLengths {
    pub chest_open: f32,
    pub chest_glow: f32,
    pub stage_complete: f32,
    pub button_click: f32,
}

impl Default for ClipLengths {
    fn default() -> Self {
        Self {
            chest_open: 1.0,
            chest_glow: 1.5,
            stage_complete: 1.0,
            button_click: 0.2,
        }
    }
}

/// Engine-wide tuning shared by every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Seconds between revealed characters.
    pub typewriter_interval: f32,
    pub typewriter_enabled: bool,
    /// Minimum seconds between two accepted dialogue requests.
    pub dialogue_cooldown: f32,
    /// Minimum seconds between two door approach reactions.
    pub door_interaction_cooldown: f32,
    /// How long the transition scene shows its message.
    pub transition_display_time: f32,
    /// Music volume while the chest open sequence plays.
    pub chest_music_volume: f32,
    pub best_time_flashes: u32,
    pub best_time_flash_interval: f32,
    pub clips: ClipLengths,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            typewriter_interval: 0.05,
            typewriter_enabled: true,
            dialogue_cooldown: 0.5,
            door_interaction_cooldown: 1.0,
            transition_display_time: 5.0,
            chest_music_volume: 0.3,
            best_time_flashes: 6,
            best_time_flash_interval: 0.2,
            clips: ClipLengths::default(),
        }
    }
}

impl EngineSettings {
    pub fn load_from_ron(path: &Path) -> Result<EngineSettings, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<EngineSettings, ConfigError> {
        Ok(ron::from_str(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"(
        name: "Stage1",
        altars: [
            (name: "west_altar", id: 0),
            (name: "east_altar", id: 1),
        ],
        altar_doors: [
            (name: "gate", required_altars: [0, 1], mode: Any),
        ],
        chests: [
            (name: "chest", altars_required: 2),
        ],
        completion: Congratulations,
    )"#;

    #[test]
    fn parse_minimal_stage_with_defaults() {
        let config = StageConfig::parse_ron(MINIMAL).unwrap();
        assert_eq!(config.name, "Stage1");
        assert_eq!(config.altars.len(), 2);
        assert!(config.altars[0].stay_awakened_once);
        assert_eq!(config.altars[0].messages.len(), 3);
        assert_eq!(config.altar_doors[0].mode, GateMode::Any);
        assert_eq!(
            config.altar_doors[0].requirement(),
            GateRequirement::any(&[0, 1])
        );
        assert_eq!(config.completion, CompletionConfig::Congratulations);
        assert!(config.timer.start_on_load);
    }

    #[test]
    fn completion_defaults_to_transition_scene() {
        let config = StageConfig::parse_ron(r#"(name: "Empty")"#).unwrap();
        assert_eq!(
            config.completion,
            CompletionConfig::Transition {
                scene: "TransitionScene".to_string()
            }
        );
    }

    #[test]
    fn duplicate_prop_names_rejected() {
        let input = r#"(
            name: "Dup",
            altars: [(name: "thing", id: 0)],
            signs: [(name: "thing")],
        )"#;
        assert!(matches!(
            StageConfig::parse_ron(input),
            Err(ConfigError::DuplicateProp(name)) if name == "thing"
        ));
    }

    #[test]
    fn duplicate_altar_ids_rejected() {
        let input = r#"(
            name: "Dup",
            altars: [(name: "a", id: 3), (name: "b", id: 3)],
        )"#;
        assert!(matches!(
            StageConfig::parse_ron(input),
            Err(ConfigError::DuplicateAltar(AltarId(3)))
        ));
    }

    #[test]
    fn door_with_unknown_altar_rejected() {
        let input = r#"(
            name: "Bad",
            altars: [(name: "a", id: 0)],
            altar_doors: [(name: "door", required_altars: [0, 9])],
        )"#;
        assert!(matches!(
            StageConfig::parse_ron(input),
            Err(ConfigError::UnknownAltar { altar: AltarId(9), .. })
        ));
    }

    #[test]
    fn door_with_no_altars_is_allowed() {
        let input = r#"(
            name: "Sealed",
            altar_doors: [(name: "door")],
        )"#;
        let config = StageConfig::parse_ron(input).unwrap();
        assert!(config.altar_doors[0].requirement().is_empty());
    }

    #[test]
    fn fixed_altar_without_message_rejected() {
        let input = r#"(
            name: "Quiet",
            altars: [(name: "a", id: 0, lock_to_fixed_dialogue: true, fixed_message: "  ")],
        )"#;
        assert!(matches!(
            StageConfig::parse_ron(input),
            Err(ConfigError::MissingMessage { prop }) if prop == "a"
        ));
    }

    #[test]
    fn empty_name_rejected() {
        assert!(matches!(
            StageConfig::parse_ron(r#"(name: "")"#),
            Err(ConfigError::EmptyStageName)
        ));
    }

    #[test]
    fn chain_altar_count_skips_fixed_altars() {
        let input = r#"(
            name: "Mixed",
            altars: [
                (name: "a", id: 0),
                (name: "b", id: 1, lock_to_fixed_dialogue: true),
            ],
        )"#;
        let config = StageConfig::parse_ron(input).unwrap();
        assert_eq!(config.chain_altar_count(), 1);
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings = EngineSettings::parse_ron("(typewriter_interval: 0.1)").unwrap();
        assert!((settings.typewriter_interval - 0.1).abs() < f32::EPSILON);
        assert!((settings.dialogue_cooldown - 0.5).abs() < f32::EPSILON);
        assert!((settings.clips.chest_glow - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn load_fixture_stage() {
        let path = std::path::PathBuf::from("tests/fixtures/test_stage.ron");
        let config = StageConfig::load_from_ron(&path).unwrap();
        assert_eq!(config.name, "TestStage");
        assert_eq!(config.altars.len(), 4);
    }
}
