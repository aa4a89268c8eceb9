//! # Tapestry
//!
//! A multi-genre RPG built around a stacked game state machine and a
//! synchronous event bus.
//!
//! ## Architecture Overview
//!
//! Every subsystem talks to every other one through the [`EventBus`]. The core
//! architecture revolves around a few key concepts:
//!
//! - **Event Bus**: Named events with JSON payloads, dispatched synchronously in
//!   subscription order
//! - **State Manager**: A registry of [`GameState`]s arranged in a stack; the top
//!   receives input, every visible state renders bottom to top
//! - **Persistent Data**: A shared key space that survives transitions and is
//!   merged into every state's entry data
//! - **Overlays**: Notification and quest displays that render above the stack
//!   and only ever learn about the game through events
//! - **Quests**: A quest book that listens to gameplay events and publishes
//!   the quest lifecycle
//!
//! ## Driving the core
//!
//! The host owns one [`StateManager`] and one [`EventBus`], registers its states
//! up front, and per frame forwards input, then updates, then renders. The
//! [`Game`] type in [`app`] does exactly that for the bundled states.

pub mod app;
pub mod events;
pub mod input;
pub mod overlays;
pub mod quests;
pub mod rendering;
pub mod save;
pub mod settings;
pub mod states;
pub mod world;

// Core module re-exports
pub use events::*;
pub use input::*;
pub use overlays::*;
pub use rendering::*;

pub use app::Game;
pub use quests::{
    ObjectiveType, Quest, QuestManager, QuestObjective, QuestProgress, QuestReward, QuestStatus,
    QuestType,
};
pub use save::{SaveInfo, SaveSystem};
pub use settings::{Difficulty, Settings};
pub use states::{
    GameState, PersistentData, StateBase, StateContext, StateData, StateManager, StateTransition,
};
pub use world::{Direction, Landmark, LandmarkKind, Position, WorldMap};

/// Core error type for the Tapestry engine.
#[derive(thiserror::Error, Debug)]
pub enum TapestryError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A transition named a state id that was never registered
    #[error("Unknown state: {0}")]
    UnknownState(String),

    /// Pop requested with nothing on the stack
    #[error("Cannot pop state: stack is empty")]
    EmptyStack,

    /// An event payload lacked a field its subscriber requires
    #[error("Invalid payload for '{event}': {reason}")]
    InvalidPayload { event: String, reason: String },

    /// An event handler reported a failure
    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Quest not found: {0}")]
    QuestNotFound(String),

    /// Quest exists but cannot make the requested status change
    #[error("Quest '{quest_id}' rejected: {reason}")]
    QuestRejected { quest_id: String, reason: String },

    #[error("Invalid save slot: {0}")]
    InvalidSaveSlot(u8),

    /// Settings file could not be understood
    #[error("Settings error: {0}")]
    Settings(String),
}

/// Result type used throughout the Tapestry codebase.
pub type TapestryResult<T> = Result<T, TapestryError>;

/// Version information for the game.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Game configuration constants.
pub mod config {
    /// Default window width in pixels
    pub const DEFAULT_SCREEN_WIDTH: f32 = 1280.0;

    /// Default window height in pixels
    pub const DEFAULT_SCREEN_HEIGHT: f32 = 720.0;

    /// Frames per second target for the game loop
    pub const TARGET_FPS: u32 = 60;

    /// Live notifications shown at once; the oldest is evicted beyond this
    pub const MAX_NOTIFICATIONS: usize = 3;

    /// Seconds a notification stays up when its payload names no duration
    pub const DEFAULT_NOTIFICATION_DURATION: f64 = 3.0;

    /// Final seconds over which a notification fades out
    pub const NOTIFICATION_FADE_TIME: f32 = 1.0;

    pub const NOTIFICATION_X: f32 = 50.0;
    pub const NOTIFICATION_Y: f32 = 50.0;

    /// Vertical distance between stacked notifications
    pub const NOTIFICATION_SPACING: f32 = 80.0;

    /// Seconds a finished quest stays in the tracker
    pub const QUEST_BANNER_DURATION: f32 = 4.0;

    /// Number of save slots, numbered from 1
    pub const SAVE_SLOTS: u8 = 5;

    /// Slot written by "Save Game" in the pause menu
    pub const QUICK_SAVE_SLOT: u8 = 1;

    /// Slot written when a quest completes and auto-save is on
    pub const AUTO_SAVE_SLOT: u8 = SAVE_SLOTS;

    /// Chance per overworld step of a random encounter
    pub const DEFAULT_ENCOUNTER_CHANCE: f64 = 0.05;

    /// Overworld width in tiles
    pub const WORLD_WIDTH: i32 = 40;

    /// Overworld height in tiles
    pub const WORLD_HEIGHT: i32 = 30;
}
