//! # Quests Module
//!
//! Quest definitions, objective progress and the [`QuestManager`] that drives
//! them from gameplay events.
//!
//! Quest files are JSON arrays of [`Quest`] objects. Only `id` and, per
//! objective, `type` and `target` are required; everything else has a default.

pub mod manager;

pub use manager::*;

use crate::TapestryResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestStatus {
    #[default]
    NotStarted,
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestType {
    Main,
    #[default]
    Side,
    World,
    Faction,
    Daily,
    Special,
}

/// What the player has to do to advance an objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectiveType {
    Kill,
    Collect,
    Talk,
    Location,
    Escort,
    Deliver,
    Craft,
    Investigate,
    Build,
    Defend,
    Boss,
    Puzzle,
    Minigame,
}

fn one() -> u32 {
    1
}

fn unnamed() -> String {
    "Unnamed Quest".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestObjective {
    pub id: String,
    #[serde(rename = "type")]
    pub objective_type: ObjectiveType,
    #[serde(default)]
    pub description: String,
    /// Enemy type, item id, NPC id or location id, depending on the type.
    /// Deliveries use `item_id:npc_id`.
    pub target: String,
    #[serde(default = "one")]
    pub required_amount: u32,
    #[serde(default)]
    pub current_amount: u32,
    #[serde(default)]
    pub completed: bool,
}

impl QuestObjective {
    pub fn new(
        id: &str,
        objective_type: ObjectiveType,
        target: &str,
        required_amount: u32,
        description: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            objective_type,
            description: description.to_string(),
            target: target.to_string(),
            required_amount,
            current_amount: 0,
            completed: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed || self.current_amount >= self.required_amount
    }

    /// Adds `amount` to the progress, capped at the required amount.
    pub fn update_progress(&mut self, amount: u32) {
        if self.completed {
            return;
        }
        self.current_amount = self
            .current_amount
            .saturating_add(amount)
            .min(self.required_amount);
        if self.current_amount >= self.required_amount {
            self.completed = true;
        }
    }

    pub fn reset(&mut self) {
        self.current_amount = 0;
        self.completed = false;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestReward {
    pub xp: u64,
    pub gold: u64,
    /// Item definitions, handed to the inventory as-is.
    pub items: Vec<Value>,
    pub unlock_quests: Vec<String>,
    pub unlock_locations: Vec<String>,
    pub unlock_items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    #[serde(default = "unnamed")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub quest_type: QuestType,
    #[serde(default = "one")]
    pub level: u32,
    #[serde(default)]
    pub status: QuestStatus,
    #[serde(default)]
    pub objectives: Vec<QuestObjective>,
    #[serde(default)]
    pub rewards: QuestReward,

    #[serde(default = "one")]
    pub required_level: u32,
    /// Quests that must be completed before this one can be accepted
    #[serde(default)]
    pub required_quests: Vec<String>,

    #[serde(default)]
    pub is_repeatable: bool,
    /// Activated automatically when a new game starts
    #[serde(default)]
    pub auto_start: bool,

    #[serde(default)]
    pub quest_giver: Option<String>,
    /// NPC the quest is turned in to; the giver when unset
    #[serde(default)]
    pub quest_receiver: Option<String>,
}

impl Quest {
    pub fn new(id: &str, title: &str, quest_type: QuestType) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            quest_type,
            level: 1,
            status: QuestStatus::NotStarted,
            objectives: Vec::new(),
            rewards: QuestReward::default(),
            required_level: 1,
            required_quests: Vec::new(),
            is_repeatable: false,
            auto_start: false,
            quest_giver: None,
            quest_receiver: None,
        }
    }

    /// True once every objective is complete (vacuously true with none).
    pub fn is_complete(&self) -> bool {
        self.objectives.iter().all(QuestObjective::is_complete)
    }

    /// Overall completion in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        if self.objectives.is_empty() {
            return if self.status == QuestStatus::Completed {
                1.0
            } else {
                0.0
            };
        }
        let required: u32 = self.objectives.iter().map(|o| o.required_amount).sum();
        let current: u32 = self
            .objectives
            .iter()
            .map(|o| o.current_amount.min(o.required_amount))
            .sum();
        if required == 0 {
            0.0
        } else {
            current as f32 / required as f32
        }
    }

    pub fn objective(&self, objective_id: &str) -> Option<&QuestObjective> {
        self.objectives.iter().find(|o| o.id == objective_id)
    }

    pub fn objective_mut(&mut self, objective_id: &str) -> Option<&mut QuestObjective> {
        self.objectives.iter_mut().find(|o| o.id == objective_id)
    }

    /// The NPC this quest is handed in to.
    pub fn turn_in_npc(&self) -> Option<&str> {
        self.quest_receiver
            .as_deref()
            .or(self.quest_giver.as_deref())
    }

    pub fn reset(&mut self) {
        self.status = QuestStatus::NotStarted;
        self.objectives.iter_mut().for_each(QuestObjective::reset);
    }

    /// The payload carried by quest lifecycle events.
    pub fn summary(&self) -> Value {
        let objectives: Vec<Value> = self
            .objectives
            .iter()
            .map(|o| {
                json!({
                    "id": o.id,
                    "description": o.description,
                    "current": o.current_amount,
                    "required": o.required_amount,
                    "completed": o.is_complete(),
                })
            })
            .collect();
        json!({
            "quest_id": self.id,
            "title": self.title,
            "status": self.status,
            "progress": self.progress(),
            "objectives": objectives,
        })
    }
}

/// Progress of one quest as stored in a progress file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestState {
    #[serde(default)]
    pub status: QuestStatus,
    #[serde(default)]
    pub objectives: Vec<ObjectiveProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveProgress {
    pub id: String,
    #[serde(default)]
    pub current_amount: u32,
    #[serde(default)]
    pub completed: bool,
}

/// Everything needed to restore the quest log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestProgress {
    pub active_quests: Vec<String>,
    pub completed_quests: Vec<String>,
    pub failed_quests: Vec<String>,
    pub quest_states: BTreeMap<String, QuestState>,
}

/// Reads a JSON array of quests.
pub fn load_quests(path: &Path) -> TapestryResult<Vec<Quest>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// The quests that ship with the starter world.
pub fn builtin_quests() -> Vec<Quest> {
    let mut welcome = Quest::new("welcome", "A New Beginning", QuestType::Main);
    welcome.description = "Look around the valley, then report to the village elder.".to_string();
    welcome.auto_start = true;
    welcome.quest_giver = Some("village_elder".to_string());
    welcome.objectives = vec![
        QuestObjective::new(
            "visit_ruins",
            ObjectiveType::Location,
            "old_ruins",
            1,
            "Visit the Old Ruins",
        ),
        QuestObjective::new(
            "report",
            ObjectiveType::Talk,
            "village_elder",
            1,
            "Report to the village elder",
        ),
    ];
    welcome.rewards = QuestReward {
        xp: 50,
        gold: 10,
        unlock_quests: vec!["wolf_problem".to_string()],
        ..QuestReward::default()
    };

    let mut wolves = Quest::new("wolf_problem", "Wolf Problem", QuestType::Side);
    wolves.description = "Wolves have been raiding the farms. Thin the pack.".to_string();
    wolves.level = 2;
    wolves.required_quests = vec!["welcome".to_string()];
    wolves.quest_giver = Some("village_elder".to_string());
    wolves.objectives = vec![QuestObjective::new(
        "hunt",
        ObjectiveType::Kill,
        "wolf",
        3,
        "Defeat wolves",
    )];
    wolves.rewards = QuestReward {
        xp: 100,
        gold: 25,
        unlock_locations: vec!["wolf_den_depths".to_string()],
        unlock_items: vec!["wolf_pelt_cloak".to_string()],
        ..QuestReward::default()
    };

    vec![welcome, wolves]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_progress_caps_at_required() {
        let mut objective = QuestObjective::new("o", ObjectiveType::Collect, "herb", 3, "");
        objective.update_progress(2);
        assert!(!objective.is_complete());
        objective.update_progress(5);
        assert_eq!(objective.current_amount, 3);
        assert!(objective.is_complete());
        objective.reset();
        assert!(!objective.is_complete());
    }

    #[test]
    fn test_quest_progress_fraction() {
        let mut quest = Quest::new("q", "Q", QuestType::Side);
        assert_eq!(quest.progress(), 0.0);
        assert!(quest.is_complete());

        quest.objectives = vec![
            QuestObjective::new("a", ObjectiveType::Kill, "wolf", 3, ""),
            QuestObjective::new("b", ObjectiveType::Talk, "elder", 1, ""),
        ];
        quest.objectives[0].update_progress(3);
        assert_eq!(quest.progress(), 0.75);
        assert!(!quest.is_complete());
    }

    #[test]
    fn test_minimal_quest_json_uses_defaults() {
        let quests: Vec<Quest> = serde_json::from_str(
            r#"[{"id": "fetch", "objectives": [{"id": "o1", "type": "COLLECT", "target": "herb"}]}]"#,
        )
        .unwrap();
        let quest = &quests[0];
        assert_eq!(quest.title, "Unnamed Quest");
        assert_eq!(quest.quest_type, QuestType::Side);
        assert_eq!(quest.status, QuestStatus::NotStarted);
        assert_eq!(quest.required_level, 1);
        assert_eq!(quest.objectives[0].required_amount, 1);
        assert_eq!(quest.turn_in_npc(), None);
    }

    #[test]
    fn test_turn_in_prefers_receiver() {
        let mut quest = Quest::new("q", "Q", QuestType::Side);
        quest.quest_giver = Some("giver".to_string());
        assert_eq!(quest.turn_in_npc(), Some("giver"));
        quest.quest_receiver = Some("receiver".to_string());
        assert_eq!(quest.turn_in_npc(), Some("receiver"));
    }

    #[test]
    fn test_builtin_quests_chain() {
        let quests = builtin_quests();
        let welcome = quests.iter().find(|q| q.id == "welcome").unwrap();
        assert!(welcome.auto_start);
        assert!(welcome.rewards.unlock_quests.contains(&"wolf_problem".to_string()));
        let wolves = quests.iter().find(|q| q.id == "wolf_problem").unwrap();
        assert_eq!(wolves.required_quests, vec!["welcome"]);
    }
}
