//! # Settings
//!
//! Runtime configuration loaded from an optional JSON file.
//!
//! Every field has a default, so a partial file (or none at all) is fine.
//! Unknown keys are ignored. Control bindings are merged over the defaults one
//! action at a time, so a file that rebinds `pause` keeps every other binding.

use crate::{config, TapestryError, TapestryResult};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Gameplay difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    /// Scales the per-step random encounter chance.
    pub fn encounter_multiplier(self) -> f64 {
        match self {
            Difficulty::Easy => 0.5,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub screen_width: f32,
    pub screen_height: f32,
    pub fullscreen: bool,
    pub fps: u32,

    pub sound_enabled: bool,
    pub music_enabled: bool,
    pub sound_volume: f32,
    pub music_volume: f32,

    pub difficulty: Difficulty,
    /// Chance of a random encounter per overworld step, before difficulty scaling
    pub encounter_chance: f64,
    pub auto_save: bool,

    /// Control action name to key name
    pub controls: BTreeMap<String, String>,

    pub save_dir: PathBuf,
    /// Quest definitions to load at startup; the built-in quests are used when unset
    pub quests_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            screen_width: config::DEFAULT_SCREEN_WIDTH,
            screen_height: config::DEFAULT_SCREEN_HEIGHT,
            fullscreen: false,
            fps: config::TARGET_FPS,
            sound_enabled: true,
            music_enabled: true,
            sound_volume: 0.7,
            music_volume: 0.5,
            difficulty: Difficulty::Normal,
            encounter_chance: config::DEFAULT_ENCOUNTER_CHANCE,
            auto_save: true,
            controls: default_controls(),
            save_dir: PathBuf::from("saves"),
            quests_file: None,
        }
    }
}

/// The built-in control bindings.
pub fn default_controls() -> BTreeMap<String, String> {
    [
        ("move_up", "UP"),
        ("move_down", "DOWN"),
        ("move_left", "LEFT"),
        ("move_right", "RIGHT"),
        ("confirm", "RETURN"),
        ("interact", "E"),
        ("attack", "SPACE"),
        ("pause", "ESCAPE"),
        ("help", "F1"),
    ]
    .into_iter()
    .map(|(action, key)| (action.to_string(), key.to_string()))
    .collect()
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults if it does not exist.
    pub fn load(path: &Path) -> TapestryResult<Self> {
        if !path.exists() {
            info!(
                "No settings file at {}; using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let settings = Self::from_json(&contents)?;
        info!("Settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Parses settings from JSON text and normalises them.
    pub fn from_json(json: &str) -> TapestryResult<Self> {
        let parsed: Settings = serde_json::from_str(json)
            .map_err(|e| TapestryError::Settings(format!("invalid settings file: {}", e)))?;
        Ok(parsed.normalized())
    }

    /// Writes the settings to `path` as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> TapestryResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Clamps out-of-range values and merges control bindings over the defaults.
    pub fn normalized(mut self) -> Self {
        self.sound_volume = self.sound_volume.clamp(0.0, 1.0);
        self.music_volume = self.music_volume.clamp(0.0, 1.0);
        self.encounter_chance = self.encounter_chance.clamp(0.0, 1.0);
        self.fps = self.fps.max(1);

        let mut controls = default_controls();
        for (action, key) in std::mem::take(&mut self.controls) {
            if controls.contains_key(&action) {
                controls.insert(action, key);
            } else {
                warn!("Ignoring unknown control action '{}'", action);
            }
        }
        self.controls = controls;
        self
    }

    /// Per-step encounter chance after difficulty scaling.
    pub fn effective_encounter_chance(&self) -> f64 {
        (self.encounter_chance * self.difficulty.encounter_multiplier()).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::from_json(
            r#"{"fullscreen": true, "difficulty": "hard", "mystery": 42}"#,
        )
        .unwrap();
        assert!(settings.fullscreen);
        assert_eq!(settings.difficulty, Difficulty::Hard);
        assert_eq!(settings.fps, config::TARGET_FPS);
        assert_eq!(settings.controls, default_controls());
    }

    #[test]
    fn test_controls_merge_over_defaults() {
        let settings = Settings::from_json(
            r#"{"controls": {"pause": "P", "dance": "Z"}}"#,
        )
        .unwrap();
        assert_eq!(settings.controls["pause"], "P");
        assert_eq!(settings.controls["move_up"], "UP");
        assert!(!settings.controls.contains_key("dance"));
    }

    #[test]
    fn test_volumes_clamped() {
        let settings =
            Settings::from_json(r#"{"sound_volume": 3.0, "music_volume": -1.0}"#).unwrap();
        assert_eq!(settings.sound_volume, 1.0);
        assert_eq!(settings.music_volume, 0.0);
    }

    #[test]
    fn test_malformed_json_is_a_settings_error() {
        assert!(matches!(
            Settings::from_json("{not json"),
            Err(TapestryError::Settings(_))
        ));
    }

    #[test]
    fn test_encounter_chance_scales_with_difficulty() {
        let mut settings = Settings::default();
        settings.encounter_chance = 0.1;
        settings.difficulty = Difficulty::Easy;
        assert!((settings.effective_encounter_chance() - 0.05).abs() < 1e-9);
        settings.encounter_chance = 0.9;
        settings.difficulty = Difficulty::Hard;
        assert_eq!(settings.effective_encounter_chance(), 1.0);
    }
}
