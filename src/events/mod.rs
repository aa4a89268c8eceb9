//! # Events Module
//!
//! Synchronous publish/subscribe plumbing shared by every subsystem.
//!
//! Nothing in Tapestry holds a direct reference to another gameplay mode. States,
//! the quest manager and the overlays talk to each other by publishing string-typed
//! events with JSON payloads on a single [`EventBus`]:
//! - State transition requests consumed by the [`StateManager`](crate::StateManager)
//! - Display events consumed by overlays (notifications, quest tracker)
//! - Gameplay progress events consumed by the [`QuestManager`](crate::QuestManager)
//!
//! Payload shapes are documented next to each event type constant below. Subscribers
//! read payloads through [`PayloadExt`] so missing or mistyped keys fall back to
//! defaults instead of failing.

pub mod bus;
pub mod payload;

pub use bus::*;
pub use payload::*;

// State transitions (consumed by the state manager)

/// Full stack replacement. Payload: `state_id`, optional `data` object.
pub const REQUEST_STATE_CHANGE: &str = "request_state_change";
/// Overlay push. Payload: `state_id`, optional `data` object.
pub const PUSH_STATE: &str = "push_state";
/// Pop the top state. Payload ignored.
pub const POP_STATE: &str = "pop_state";

// Display

/// Payload: `title`, `message`, optional `duration` in seconds.
pub const SHOW_NOTIFICATION: &str = "show_notification";

// Quest lifecycle (published by the quest manager)

pub const QUEST_ACTIVATED: &str = "quest_activated";
pub const QUEST_UPDATED: &str = "quest_updated";
pub const QUEST_OBJECTIVES_COMPLETE: &str = "quest_objectives_complete";
pub const QUEST_COMPLETED: &str = "quest_completed";
pub const QUEST_FAILED: &str = "quest_failed";
pub const QUEST_AVAILABLE: &str = "quest_available";
pub const LOCATION_UNLOCKED: &str = "location_unlocked";
pub const ITEM_UNLOCKED: &str = "item_unlocked";

/// Request to accept a quest. Payload: `quest_id`.
pub const ACCEPT_QUEST: &str = "accept_quest";

// Gameplay progress

/// Payload: `enemy_type`.
pub const ENEMY_KILLED: &str = "enemy_killed";
/// Payload: `item_id`, optional `amount`.
pub const ITEM_COLLECTED: &str = "item_collected";
/// Payload: `npc_id`.
pub const NPC_TALKED: &str = "npc_talked";
/// Payload: `location_id`.
pub const LOCATION_VISITED: &str = "location_visited";
/// Payload: `item_id`, optional `amount`.
pub const ITEM_CRAFTED: &str = "item_crafted";
/// Payload: `item_id`, `npc_id`.
pub const ITEM_DELIVERED: &str = "item_delivered";
/// Payload: `structure_id`.
pub const STRUCTURE_BUILT: &str = "structure_built";
/// Payload: `boss_id`.
pub const BOSS_DEFEATED: &str = "boss_defeated";
/// Payload: `puzzle_id`.
pub const PUZZLE_SOLVED: &str = "puzzle_solved";
/// Payload: `minigame_id`, `success`, optional `score`.
pub const MINIGAME_COMPLETED: &str = "minigame_completed";

// Application

/// Published by the main menu after seeding persistent data for a fresh run.
pub const NEW_GAME_STARTED: &str = "new_game_started";
/// Published after a save slot has been loaded into persistent data. Payload: `slot`.
pub const GAME_LOADED: &str = "game_loaded";
/// Payload: `slot`.
pub const GAME_SAVED: &str = "game_saved";
pub const QUIT_GAME: &str = "quit_game";
