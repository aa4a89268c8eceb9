//! # Quest Manager
//!
//! Tracks quest status and objective progress and turns gameplay events into
//! quest lifecycle events.
//!
//! The manager listens for progress events (`enemy_killed`, `npc_talked`,
//! `location_visited`, ...) and publishes `quest_activated`, `quest_updated`,
//! `quest_objectives_complete`, `quest_completed`, `quest_failed` and
//! `quest_available`. Nothing calls into gameplay code: rewards land in the
//! persistent `player_character` record and unlocks are announced as events.

use crate::events::*;
use crate::quests::{
    builtin_quests, load_quests, ObjectiveProgress, ObjectiveType, Quest, QuestProgress,
    QuestReward, QuestState, QuestStatus,
};
use crate::states::PersistentData;
use crate::{TapestryError, TapestryResult};
use log::{debug, info, warn};
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::{Rc, Weak};

/// Persistent key mirroring the quest log, so saves carry it.
pub const QUEST_PROGRESS_KEY: &str = "quest_progress";

/// Events queued while the quest book is borrowed, published afterwards.
type Outbox = Vec<(&'static str, Value)>;

const PROGRESS_EVENTS: [&str; 10] = [
    ENEMY_KILLED,
    ITEM_COLLECTED,
    NPC_TALKED,
    LOCATION_VISITED,
    ITEM_CRAFTED,
    ITEM_DELIVERED,
    STRUCTURE_BUILT,
    BOSS_DEFEATED,
    PUZZLE_SOLVED,
    MINIGAME_COMPLETED,
];

/// Maps a progress event to the objectives it advances.
///
/// Returns `None` when the payload lacks the identifying field, or for a
/// failed minigame.
pub fn objective_progress(event_type: &str, payload: &Value) -> Option<(ObjectiveType, String, u32)> {
    let amount = payload.u64_or("amount", 1).min(u32::MAX as u64) as u32;
    let single = |objective_type: ObjectiveType, key: &str| {
        payload
            .str_field(key)
            .map(|target| (objective_type, target.to_string(), 1))
    };

    match event_type {
        ENEMY_KILLED => single(ObjectiveType::Kill, "enemy_type"),
        ITEM_COLLECTED => payload
            .str_field("item_id")
            .map(|target| (ObjectiveType::Collect, target.to_string(), amount)),
        NPC_TALKED => single(ObjectiveType::Talk, "npc_id"),
        LOCATION_VISITED => single(ObjectiveType::Location, "location_id"),
        ITEM_CRAFTED => payload
            .str_field("item_id")
            .map(|target| (ObjectiveType::Craft, target.to_string(), amount)),
        ITEM_DELIVERED => {
            let item = payload.str_field("item_id")?;
            let npc = payload.str_field("npc_id")?;
            Some((ObjectiveType::Deliver, format!("{}:{}", item, npc), 1))
        }
        STRUCTURE_BUILT => single(ObjectiveType::Build, "structure_id"),
        BOSS_DEFEATED => single(ObjectiveType::Boss, "boss_id"),
        PUZZLE_SOLVED => single(ObjectiveType::Puzzle, "puzzle_id"),
        MINIGAME_COMPLETED if payload.bool_or("success", false) => {
            single(ObjectiveType::Minigame, "minigame_id")
        }
        _ => None,
    }
}

#[derive(Debug, Default)]
struct QuestBook {
    quests: BTreeMap<String, Quest>,
    active: Vec<String>,
    completed: Vec<String>,
    failed: Vec<String>,
}

impl QuestBook {
    fn check_requirements(&self, quest: &Quest, player_level: u32) -> Result<(), String> {
        if player_level < quest.required_level {
            return Err(format!(
                "requires level {} (player is level {})",
                quest.required_level, player_level
            ));
        }
        if let Some(missing) = quest
            .required_quests
            .iter()
            .find(|id| !self.completed.contains(id))
        {
            return Err(format!("requires quest '{}'", missing));
        }
        Ok(())
    }

    fn available(&self, player_level: u32) -> Vec<Quest> {
        self.quests
            .values()
            .filter(|quest| {
                !self.active.contains(&quest.id)
                    && !self.completed.contains(&quest.id)
                    && !self.failed.contains(&quest.id)
            })
            .filter(|quest| self.check_requirements(quest, player_level).is_ok())
            .cloned()
            .collect()
    }

    fn activate(&mut self, quest_id: &str, player_level: u32) -> TapestryResult<Outbox> {
        let rejected = |reason: &str| TapestryError::QuestRejected {
            quest_id: quest_id.to_string(),
            reason: reason.to_string(),
        };

        let quest = self
            .quests
            .get(quest_id)
            .ok_or_else(|| TapestryError::QuestNotFound(quest_id.to_string()))?;
        if self.active.iter().any(|id| id == quest_id) {
            return Err(rejected("already active"));
        }
        let was_completed = self.completed.iter().any(|id| id == quest_id);
        if was_completed && !quest.is_repeatable {
            return Err(rejected("already completed and not repeatable"));
        }
        self.check_requirements(quest, player_level)
            .map_err(|reason| rejected(&reason))?;

        self.completed.retain(|id| id != quest_id);
        self.failed.retain(|id| id != quest_id);
        self.active.push(quest_id.to_string());

        let quest = self
            .quests
            .get_mut(quest_id)
            .ok_or_else(|| TapestryError::QuestNotFound(quest_id.to_string()))?;
        if was_completed {
            quest.reset();
        }
        quest.status = QuestStatus::Active;
        info!("Activated quest: {}", quest.title);
        Ok(vec![(QUEST_ACTIVATED, quest.summary())])
    }

    fn complete(
        &mut self,
        quest_id: &str,
        player_level: u32,
    ) -> TapestryResult<(QuestReward, Outbox)> {
        let rejected = |reason: &str| TapestryError::QuestRejected {
            quest_id: quest_id.to_string(),
            reason: reason.to_string(),
        };

        let quest = self
            .quests
            .get_mut(quest_id)
            .ok_or_else(|| TapestryError::QuestNotFound(quest_id.to_string()))?;
        if !self.active.iter().any(|id| id == quest_id) {
            return Err(rejected("not active"));
        }
        if !quest.is_complete() {
            return Err(rejected("objectives incomplete"));
        }

        quest.status = QuestStatus::Completed;
        let rewards = quest.rewards.clone();
        let mut completed = quest.summary();
        completed["rewards"] = json!({"xp": rewards.xp, "gold": rewards.gold});
        info!("Completed quest: {}", quest.title);

        self.active.retain(|id| id != quest_id);
        self.completed.push(quest_id.to_string());

        let mut outbox: Outbox = Vec::new();
        for location_id in &rewards.unlock_locations {
            outbox.push((
                LOCATION_UNLOCKED,
                json!({"location_id": location_id, "quest_id": quest_id}),
            ));
        }
        for item_id in &rewards.unlock_items {
            outbox.push((
                ITEM_UNLOCKED,
                json!({"item_id": item_id, "quest_id": quest_id}),
            ));
        }
        outbox.push((QUEST_COMPLETED, completed));

        for quest in self.quests.values() {
            if quest.status == QuestStatus::NotStarted
                && self.check_requirements(quest, player_level).is_ok()
                && quest.required_quests.iter().any(|id| id == quest_id)
            {
                outbox.push((QUEST_AVAILABLE, quest.summary()));
            }
        }
        Ok((rewards, outbox))
    }

    fn fail(&mut self, quest_id: &str) -> TapestryResult<Outbox> {
        let quest = self
            .quests
            .get_mut(quest_id)
            .ok_or_else(|| TapestryError::QuestNotFound(quest_id.to_string()))?;
        if !self.active.iter().any(|id| id == quest_id) {
            return Err(TapestryError::QuestRejected {
                quest_id: quest_id.to_string(),
                reason: "not active".to_string(),
            });
        }

        quest.status = QuestStatus::Failed;
        info!("Failed quest: {}", quest.title);
        let summary = quest.summary();
        self.active.retain(|id| id != quest_id);
        self.failed.push(quest_id.to_string());
        Ok(vec![(QUEST_FAILED, summary)])
    }

    fn update_objectives(
        &mut self,
        objective_type: ObjectiveType,
        target: &str,
        amount: u32,
    ) -> (Vec<String>, Outbox) {
        let mut updated = Vec::new();
        let mut outbox: Outbox = Vec::new();

        for quest_id in &self.active {
            let Some(quest) = self.quests.get_mut(quest_id) else {
                continue;
            };
            let mut touched = false;
            for objective in quest.objectives.iter_mut() {
                if objective.objective_type == objective_type
                    && objective.target == target
                    && !objective.is_complete()
                {
                    objective.update_progress(amount);
                    touched = true;
                }
            }
            if touched {
                let event_type = if quest.is_complete() {
                    QUEST_OBJECTIVES_COMPLETE
                } else {
                    QUEST_UPDATED
                };
                outbox.push((event_type, quest.summary()));
                updated.push(quest_id.clone());
            }
        }
        (updated, outbox)
    }

    /// Active, complete quests handed in to `npc_id`.
    fn ready_for_turn_in(&self, npc_id: &str) -> Vec<String> {
        self.active
            .iter()
            .filter_map(|id| self.quests.get(id))
            .filter(|quest| quest.is_complete() && quest.turn_in_npc() == Some(npc_id))
            .map(|quest| quest.id.clone())
            .collect()
    }

    fn reset(&mut self) {
        self.quests.values_mut().for_each(Quest::reset);
        self.active.clear();
        self.completed.clear();
        self.failed.clear();
    }

    fn progress(&self) -> QuestProgress {
        let quest_states = self
            .quests
            .iter()
            .map(|(id, quest)| {
                let objectives = quest
                    .objectives
                    .iter()
                    .map(|o| ObjectiveProgress {
                        id: o.id.clone(),
                        current_amount: o.current_amount,
                        completed: o.completed,
                    })
                    .collect();
                (
                    id.clone(),
                    QuestState {
                        status: quest.status,
                        objectives,
                    },
                )
            })
            .collect();
        QuestProgress {
            active_quests: self.active.clone(),
            completed_quests: self.completed.clone(),
            failed_quests: self.failed.clone(),
            quest_states,
        }
    }

    fn restore(&mut self, progress: QuestProgress) {
        self.reset();
        let known = |ids: Vec<String>, quests: &BTreeMap<String, Quest>| -> Vec<String> {
            ids.into_iter()
                .filter(|id| {
                    let exists = quests.contains_key(id);
                    if !exists {
                        warn!("Ignoring progress for unknown quest '{}'", id);
                    }
                    exists
                })
                .collect()
        };
        self.active = known(progress.active_quests, &self.quests);
        self.completed = known(progress.completed_quests, &self.quests);
        self.failed = known(progress.failed_quests, &self.quests);

        for (quest_id, state) in progress.quest_states {
            let Some(quest) = self.quests.get_mut(&quest_id) else {
                continue;
            };
            quest.status = state.status;
            for saved in state.objectives {
                if let Some(objective) = quest.objective_mut(&saved.id) {
                    objective.current_amount = saved.current_amount;
                    objective.completed = saved.completed;
                }
            }
        }
    }
}

struct QuestCore {
    book: RefCell<QuestBook>,
    event_bus: EventBus,
    persistent: PersistentData,
}

impl QuestCore {
    fn player_level(&self) -> u32 {
        self.persistent
            .get("player_character")
            .map_or(1, |character| character.u64_or("level", 1))
            .clamp(1, u32::MAX as u64) as u32
    }

    /// Publishes queued events and mirrors the quest log into persistent data.
    fn flush(&self, outbox: Outbox) {
        self.sync_persistent();
        for (event_type, payload) in outbox {
            self.event_bus.publish(event_type, payload);
        }
    }

    fn sync_persistent(&self) {
        let progress = self.book.borrow().progress();
        if let Err(e) = self.persistent.set_as(QUEST_PROGRESS_KEY, &progress) {
            warn!("Could not mirror quest progress: {}", e);
        }
    }

    fn activate(&self, quest_id: &str) -> TapestryResult<()> {
        let level = self.player_level();
        let outbox = self.book.borrow_mut().activate(quest_id, level)?;
        self.flush(outbox);
        Ok(())
    }

    fn complete(&self, quest_id: &str) -> TapestryResult<()> {
        let level = self.player_level();
        let (rewards, outbox) = self.book.borrow_mut().complete(quest_id, level)?;
        self.award(&rewards);
        self.flush(outbox);
        Ok(())
    }

    fn fail(&self, quest_id: &str) -> TapestryResult<()> {
        let outbox = self.book.borrow_mut().fail(quest_id)?;
        self.flush(outbox);
        Ok(())
    }

    fn update_objectives(&self, objective_type: ObjectiveType, target: &str, amount: u32) -> Vec<String> {
        let (updated, outbox) = self
            .book
            .borrow_mut()
            .update_objectives(objective_type, target, amount);
        if !updated.is_empty() {
            self.flush(outbox);
        }
        updated
    }

    fn award(&self, rewards: &QuestReward) {
        if rewards.xp == 0 && rewards.gold == 0 {
            return;
        }
        let mut character = match self.persistent.get("player_character") {
            Some(Value::Object(character)) => character,
            _ => Map::new(),
        };
        let xp = character.get("xp").and_then(Value::as_u64).unwrap_or(0) + rewards.xp;
        let gold = character.get("gold").and_then(Value::as_u64).unwrap_or(0) + rewards.gold;
        character.insert("xp".to_string(), xp.into());
        character.insert("gold".to_string(), gold.into());
        self.persistent
            .set("player_character", Value::Object(character));
        debug!("Awarded {} xp and {} gold", rewards.xp, rewards.gold);
    }

    fn on_progress(&self, event_type: &str, payload: &Value) -> TapestryResult<()> {
        let Some((objective_type, target, amount)) = objective_progress(event_type, payload)
        else {
            return Ok(());
        };
        self.update_objectives(objective_type, &target, amount);

        if event_type == NPC_TALKED {
            let ready = self.book.borrow().ready_for_turn_in(&target);
            for quest_id in ready {
                self.complete(&quest_id)?;
            }
        }
        Ok(())
    }

    fn start_new_game(&self) {
        let auto_start: Vec<String> = {
            let mut book = self.book.borrow_mut();
            book.reset();
            book.quests
                .values()
                .filter(|quest| quest.auto_start)
                .map(|quest| quest.id.clone())
                .collect()
        };
        self.sync_persistent();
        for quest_id in auto_start {
            if let Err(e) = self.activate(&quest_id) {
                warn!("Could not start quest '{}': {}", quest_id, e);
            }
        }
    }

    /// Reloads the quest log from persistent data and re-announces active quests.
    fn restore_from_persistent(&self) {
        let progress = self
            .persistent
            .get_as::<QuestProgress>(QUEST_PROGRESS_KEY)
            .unwrap_or_default();
        let outbox: Outbox = {
            let mut book = self.book.borrow_mut();
            book.restore(progress);
            book.active
                .iter()
                .filter_map(|id| book.quests.get(id))
                .map(|quest| (QUEST_ACTIVATED, quest.summary()))
                .collect()
        };
        self.flush(outbox);
    }
}

/// Owns the quest log and keeps it in step with gameplay events.
///
/// Subscriptions are removed when the manager is dropped.
pub struct QuestManager {
    core: Rc<QuestCore>,
    subscriptions: Vec<(&'static str, EventHandler)>,
}

impl QuestManager {
    pub fn new(event_bus: &EventBus, persistent: PersistentData) -> Self {
        let core = Rc::new(QuestCore {
            book: RefCell::new(QuestBook::default()),
            event_bus: event_bus.clone(),
            persistent,
        });

        let mut subscriptions = Vec::new();
        for event_type in PROGRESS_EVENTS {
            subscriptions.push((
                event_type,
                handler(&core, event_type, move |core, payload| {
                    core.on_progress(event_type, payload)
                }),
            ));
        }
        subscriptions.push((
            ACCEPT_QUEST,
            handler(&core, ACCEPT_QUEST, |core, payload| {
                let quest_id = payload.str_field("quest_id").ok_or_else(|| {
                    TapestryError::InvalidPayload {
                        event: ACCEPT_QUEST.to_string(),
                        reason: "missing string field 'quest_id'".to_string(),
                    }
                })?;
                core.activate(quest_id)
            }),
        ));
        subscriptions.push((
            NEW_GAME_STARTED,
            handler(&core, NEW_GAME_STARTED, |core, _| {
                core.start_new_game();
                Ok(())
            }),
        ));
        subscriptions.push((
            GAME_LOADED,
            handler(&core, GAME_LOADED, |core, _| {
                core.restore_from_persistent();
                Ok(())
            }),
        ));

        for (event_type, handler) in &subscriptions {
            event_bus.subscribe(*event_type, handler.clone());
        }

        info!("QuestManager initialized");
        Self {
            core,
            subscriptions,
        }
    }

    /// Adds or replaces a quest definition.
    pub fn add_quest(&self, quest: Quest) {
        self.core
            .book
            .borrow_mut()
            .quests
            .insert(quest.id.clone(), quest);
    }

    pub fn load_builtin_quests(&self) {
        for quest in builtin_quests() {
            self.add_quest(quest);
        }
    }

    /// Loads quest definitions from a JSON file. Returns how many were loaded.
    pub fn load_quests_from_file(&self, path: &Path) -> TapestryResult<usize> {
        let quests = load_quests(path)?;
        let count = quests.len();
        for quest in quests {
            self.add_quest(quest);
        }
        info!("Loaded {} quests from {}", count, path.display());
        Ok(count)
    }

    pub fn quest(&self, quest_id: &str) -> Option<Quest> {
        self.core.book.borrow().quests.get(quest_id).cloned()
    }

    pub fn status(&self, quest_id: &str) -> Option<QuestStatus> {
        self.core
            .book
            .borrow()
            .quests
            .get(quest_id)
            .map(|quest| quest.status)
    }

    pub fn active_quests(&self) -> Vec<String> {
        self.core.book.borrow().active.clone()
    }

    pub fn completed_quests(&self) -> Vec<String> {
        self.core.book.borrow().completed.clone()
    }

    pub fn failed_quests(&self) -> Vec<String> {
        self.core.book.borrow().failed.clone()
    }

    /// Quests the player could accept right now.
    pub fn available_quests(&self) -> Vec<Quest> {
        let level = self.core.player_level();
        self.core.book.borrow().available(level)
    }

    /// Starts a quest, publishing `quest_activated`.
    pub fn activate_quest(&self, quest_id: &str) -> TapestryResult<()> {
        self.core.activate(quest_id)
    }

    /// Completes an active quest whose objectives are all done and awards it.
    pub fn complete_quest(&self, quest_id: &str) -> TapestryResult<()> {
        self.core.complete(quest_id)
    }

    pub fn fail_quest(&self, quest_id: &str) -> TapestryResult<()> {
        self.core.fail(quest_id)
    }

    /// Advances matching objectives on active quests. Returns the ids of the
    /// quests that changed.
    pub fn update_objectives(
        &self,
        objective_type: ObjectiveType,
        target: &str,
        amount: u32,
    ) -> Vec<String> {
        self.core.update_objectives(objective_type, target, amount)
    }

    /// Clears all progress and activates the auto-start quests.
    pub fn start_new_game(&self) {
        self.core.start_new_game();
    }

    pub fn progress(&self) -> QuestProgress {
        self.core.book.borrow().progress()
    }

    pub fn restore_progress(&self, progress: QuestProgress) {
        self.core.book.borrow_mut().restore(progress);
        self.core.sync_persistent();
    }

    pub fn save_progress(&self, path: &Path) -> TapestryResult<()> {
        fs::write(path, serde_json::to_string_pretty(&self.progress())?)?;
        info!("Saved quest progress to {}", path.display());
        Ok(())
    }

    pub fn load_progress(&self, path: &Path) -> TapestryResult<()> {
        let progress: QuestProgress = serde_json::from_str(&fs::read_to_string(path)?)?;
        self.restore_progress(progress);
        info!("Loaded quest progress from {}", path.display());
        Ok(())
    }
}

fn handler<F>(core: &Rc<QuestCore>, event_type: &'static str, on_event: F) -> EventHandler
where
    F: Fn(&QuestCore, &Value) -> TapestryResult<()> + 'static,
{
    let core: Weak<QuestCore> = Rc::downgrade(core);
    EventHandler::named(format!("quest_manager.{}", event_type), move |payload| {
        match core.upgrade() {
            Some(core) => on_event(&core, payload),
            None => Ok(()),
        }
    })
}

impl Drop for QuestManager {
    fn drop(&mut self) {
        for (event_type, handler) in &self.subscriptions {
            self.core.event_bus.unsubscribe(event_type, handler);
        }
    }
}
