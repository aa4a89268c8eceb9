//! Quest events flowing from gameplay publishers to the overlays.

use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use tapestry::{
    EventBus, EventHandler, NotificationManager, Overlay, PersistentData, Quest, QuestManager,
    QuestObjective, QuestProgress, QuestStatus, QuestTracker, QuestType, ObjectiveType, ACCEPT_QUEST,
    ENEMY_KILLED, LOCATION_VISITED, NEW_GAME_STARTED, NPC_TALKED, QUEST_AVAILABLE,
    QUEST_COMPLETED, SHOW_NOTIFICATION,
};
use tempfile::TempDir;

fn wolf_hunt() -> Quest {
    let mut quest = Quest::new("wolf_hunt", "Wolf Hunt", QuestType::Side);
    quest.objectives = vec![QuestObjective::new(
        "wolves",
        ObjectiveType::Kill,
        "wolf",
        2,
        "Defeat wolves",
    )];
    quest.quest_giver = Some("hunter".to_string());
    quest.rewards.xp = 40;
    quest.rewards.gold = 5;
    quest
}

fn collect(bus: &EventBus, event_type: &'static str) -> Rc<RefCell<Vec<Value>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    bus.subscribe(
        event_type,
        EventHandler::new(move |payload| {
            sink.borrow_mut().push(payload.clone());
            Ok(())
        }),
    );
    seen
}

#[test]
fn test_kills_then_turn_in_complete_quest() {
    let bus = EventBus::new();
    let persistent = PersistentData::new();
    persistent.set("player_character", json!({"level": 1, "xp": 0, "gold": 0}));
    let tracker = QuestTracker::new(&bus);
    let quests = QuestManager::new(&bus, persistent.clone());
    quests.add_quest(wolf_hunt());
    let completed = collect(&bus, QUEST_COMPLETED);

    bus.publish(ACCEPT_QUEST, json!({"quest_id": "wolf_hunt"}));
    assert_eq!(tracker.record("wolf_hunt").unwrap().status, QuestStatus::Active);

    bus.publish(ENEMY_KILLED, json!({"enemy_type": "wolf"}));
    assert_eq!(
        tracker.record("wolf_hunt").unwrap().objectives,
        vec!["Defeat wolves (1/2)"]
    );

    bus.publish(ENEMY_KILLED, json!({"enemy_type": "goblin"}));
    bus.publish(ENEMY_KILLED, json!({"enemy_type": "wolf"}));
    assert_eq!(quests.status("wolf_hunt"), Some(QuestStatus::Active));
    assert!(completed.borrow().is_empty());

    bus.publish(NPC_TALKED, json!({"npc_id": "hunter"}));
    assert_eq!(quests.status("wolf_hunt"), Some(QuestStatus::Completed));
    assert_eq!(completed.borrow().len(), 1);
    assert_eq!(tracker.record("wolf_hunt").unwrap().status, QuestStatus::Completed);

    let character = persistent.get("player_character").unwrap();
    assert_eq!(character["xp"], json!(40));
    assert_eq!(character["gold"], json!(5));
}

#[test]
fn test_new_game_chain_unlocks_follow_up() {
    let bus = EventBus::new();
    let persistent = PersistentData::new();
    let tracker = QuestTracker::new(&bus);
    let quests = QuestManager::new(&bus, persistent);
    quests.load_builtin_quests();
    let available = collect(&bus, QUEST_AVAILABLE);

    bus.publish(NEW_GAME_STARTED, Value::Null);
    assert_eq!(quests.active_quests(), vec!["welcome"]);

    bus.publish(LOCATION_VISITED, json!({"location_id": "old_ruins"}));
    bus.publish(NPC_TALKED, json!({"npc_id": "village_elder"}));
    bus.publish(NPC_TALKED, json!({"npc_id": "village_elder"}));

    assert_eq!(quests.status("welcome"), Some(QuestStatus::Completed));
    assert_eq!(available.borrow()[0]["quest_id"], json!("wolf_problem"));
    assert!(quests
        .available_quests()
        .iter()
        .any(|quest| quest.id == "wolf_problem"));
    assert!(tracker.record("welcome").is_some());
}

#[test]
fn test_notifications_ignore_state_identity() {
    let bus = EventBus::new();
    let mut notifications = NotificationManager::new(&bus);

    bus.publish(SHOW_NOTIFICATION, json!({"title": "Hello", "duration": 0.5}));
    bus.publish("some_unrelated_event", json!({"title": "ignored"}));
    assert_eq!(notifications.len(), 1);

    notifications.update(0.6);
    assert!(notifications.is_empty());
}

#[test]
fn test_progress_round_trips_through_a_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quests.json");

    let bus = EventBus::new();
    let quests = QuestManager::new(&bus, PersistentData::new());
    quests.add_quest(wolf_hunt());
    quests.activate_quest("wolf_hunt").unwrap();
    bus.publish(ENEMY_KILLED, json!({"enemy_type": "wolf"}));
    quests.save_progress(&path).unwrap();

    let other_bus = EventBus::new();
    let restored = QuestManager::new(&other_bus, PersistentData::new());
    restored.add_quest(wolf_hunt());
    restored.load_progress(&path).unwrap();

    let progress: QuestProgress = restored.progress();
    assert_eq!(progress.active_quests, vec!["wolf_hunt"]);
    let quest = restored.quest("wolf_hunt").unwrap();
    assert_eq!(quest.objectives[0].current_amount, 1);
}
