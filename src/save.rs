//! # Save System
//!
//! Numbered save slots, one JSON file per slot.
//!
//! A save holds a copy of the persistent data key space (`world`,
//! `player_character`, `player_world_position`, quest progress, ...) plus free
//! metadata such as the location name shown in the load menu.

use crate::states::StateData;
use crate::{config, TapestryError, TapestryResult};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// On-disk layout of one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveFile {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    #[serde(default)]
    pub metadata: StateData,
    #[serde(default)]
    pub game_state: StateData,
}

/// Summary of a slot, for save and load menus.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveInfo {
    pub slot: u8,
    pub exists: bool,
    pub timestamp: Option<f64>,
    pub metadata: StateData,
    /// Set when the slot exists but could not be read.
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SaveSystem {
    save_dir: PathBuf,
    max_slots: u8,
}

impl SaveSystem {
    /// Opens (and creates if needed) a save directory.
    pub fn new(save_dir: impl Into<PathBuf>) -> TapestryResult<Self> {
        let save_dir = save_dir.into();
        fs::create_dir_all(&save_dir)?;
        info!("SaveSystem initialized with directory: {}", save_dir.display());
        Ok(Self {
            save_dir,
            max_slots: config::SAVE_SLOTS,
        })
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn max_slots(&self) -> u8 {
        self.max_slots
    }

    fn slot_path(&self, slot: u8) -> TapestryResult<PathBuf> {
        if slot == 0 || slot > self.max_slots {
            return Err(TapestryError::InvalidSaveSlot(slot));
        }
        Ok(self.save_dir.join(format!("save_{}.json", slot)))
    }

    /// Writes `game_state` to `slot`, replacing any existing save.
    pub fn save_game(
        &self,
        slot: u8,
        game_state: &StateData,
        metadata: Option<StateData>,
    ) -> TapestryResult<PathBuf> {
        let path = self.slot_path(slot)?;
        let save = SaveFile {
            timestamp: now_secs(),
            metadata: metadata.unwrap_or_default(),
            game_state: game_state.clone(),
        };
        fs::write(&path, serde_json::to_string_pretty(&save)?)?;
        info!("Game saved to slot {}", slot);
        Ok(path)
    }

    /// Reads the saved game state from `slot`; `None` if the slot is empty.
    pub fn load_game(&self, slot: u8) -> TapestryResult<Option<StateData>> {
        let path = self.slot_path(slot)?;
        if !path.exists() {
            warn!("No save file found in slot {}", slot);
            return Ok(None);
        }
        let save: SaveFile = serde_json::from_str(&fs::read_to_string(&path)?)?;
        info!("Game loaded from slot {}", slot);
        Ok(Some(save.game_state))
    }

    pub fn has_save(&self, slot: u8) -> bool {
        self.slot_path(slot).map_or(false, |path| path.exists())
    }

    /// Deletes the save in `slot`. Returns false if the slot was already empty.
    pub fn delete_save(&self, slot: u8) -> TapestryResult<bool> {
        let path = self.slot_path(slot)?;
        if !path.exists() {
            warn!("No save file found in slot {}", slot);
            return Ok(false);
        }
        fs::remove_file(&path)?;
        info!("Deleted save in slot {}", slot);
        Ok(true)
    }

    pub fn save_info(&self, slot: u8) -> TapestryResult<SaveInfo> {
        let path = self.slot_path(slot)?;
        let mut info = SaveInfo {
            slot,
            exists: path.exists(),
            timestamp: None,
            metadata: StateData::new(),
            error: None,
        };
        if !info.exists {
            return Ok(info);
        }

        let parsed = fs::read_to_string(&path)
            .map_err(TapestryError::from)
            .and_then(|text| serde_json::from_str::<SaveFile>(&text).map_err(TapestryError::from));
        match parsed {
            Ok(save) => {
                info.timestamp = Some(save.timestamp);
                info.metadata = save.metadata;
            }
            Err(e) => {
                error!("Error reading save info from slot {}: {}", slot, e);
                info.error = Some(e.to_string());
            }
        }
        Ok(info)
    }

    /// Info for every slot, in slot order.
    pub fn all_save_info(&self) -> Vec<SaveInfo> {
        (1..=self.max_slots)
            .filter_map(|slot| self.save_info(slot).ok())
            .collect()
    }

    /// The readable slot with the most recent timestamp.
    pub fn latest_slot(&self) -> Option<u8> {
        self.all_save_info()
            .into_iter()
            .filter_map(|info| info.timestamp.map(|timestamp| (info.slot, timestamp)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(slot, _)| slot)
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn state(value: serde_json::Value) -> StateData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_save_and_load_slot() {
        let dir = TempDir::new().unwrap();
        let saves = SaveSystem::new(dir.path()).unwrap();

        saves
            .save_game(2, &state(json!({"player_world_position": {"x": 1, "y": 2}})), None)
            .unwrap();

        assert!(saves.has_save(2));
        assert!(!saves.has_save(1));
        let loaded = saves.load_game(2).unwrap().unwrap();
        assert_eq!(loaded["player_world_position"], json!({"x": 1, "y": 2}));
        assert_eq!(saves.load_game(1).unwrap(), None);
    }

    #[test]
    fn test_invalid_slots_rejected() {
        let dir = TempDir::new().unwrap();
        let saves = SaveSystem::new(dir.path()).unwrap();
        assert!(matches!(
            saves.save_game(0, &StateData::new(), None),
            Err(TapestryError::InvalidSaveSlot(0))
        ));
        assert!(matches!(
            saves.load_game(config::SAVE_SLOTS + 1),
            Err(TapestryError::InvalidSaveSlot(_))
        ));
        assert!(!saves.has_save(99));
    }

    #[test]
    fn test_delete_and_info() {
        let dir = TempDir::new().unwrap();
        let saves = SaveSystem::new(dir.path()).unwrap();
        saves
            .save_game(1, &StateData::new(), Some(state(json!({"location": "Oakvale"}))))
            .unwrap();

        let info = saves.save_info(1).unwrap();
        assert!(info.exists);
        assert_eq!(info.metadata["location"], json!("Oakvale"));
        assert_eq!(saves.all_save_info().len(), config::SAVE_SLOTS as usize);

        assert!(saves.delete_save(1).unwrap());
        assert!(!saves.delete_save(1).unwrap());
        assert!(!saves.save_info(1).unwrap().exists);
    }

    #[test]
    fn test_corrupt_slot_reports_error() {
        let dir = TempDir::new().unwrap();
        let saves = SaveSystem::new(dir.path()).unwrap();
        fs::write(dir.path().join("save_3.json"), "garbage").unwrap();

        let info = saves.save_info(3).unwrap();
        assert!(info.exists);
        assert!(info.error.is_some());
        assert_eq!(saves.latest_slot(), None);
        assert!(saves.load_game(3).is_err());
    }

    #[test]
    fn test_latest_slot_uses_timestamp() {
        let dir = TempDir::new().unwrap();
        let saves = SaveSystem::new(dir.path()).unwrap();
        let older = SaveFile {
            timestamp: 100.0,
            metadata: StateData::new(),
            game_state: StateData::new(),
        };
        let newer = SaveFile {
            timestamp: 200.0,
            ..older.clone()
        };
        fs::write(dir.path().join("save_4.json"), serde_json::to_string(&older).unwrap()).unwrap();
        fs::write(dir.path().join("save_2.json"), serde_json::to_string(&newer).unwrap()).unwrap();

        assert_eq!(saves.latest_slot(), Some(2));
    }
}
