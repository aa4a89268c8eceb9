//! # Game Host
//!
//! Wires the bus, the state stack, the quest system and the overlays together
//! and drives them once per frame.

use crate::config::AUTO_SAVE_SLOT;
use crate::events::{EventBus, EventHandler, QUEST_COMPLETED, QUIT_GAME};
use crate::input::InputEvent;
use crate::overlays::{NotificationManager, Overlay, QuestTracker};
use crate::quests::QuestManager;
use crate::rendering::Surface;
use crate::save::SaveSystem;
use crate::settings::Settings;
use crate::states::{
    CombatState, MainMenuState, PauseMenuState, PersistentData, StateManager,
    WorldExplorationState,
};
use crate::TapestryResult;
use log::{error, info, warn};
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

/// The assembled game.
///
/// Overlays subscribe before the quest manager, so on `new_game_started` the
/// tracker clears before the new run's quests are announced.
pub struct Game {
    event_bus: EventBus,
    notifications: NotificationManager,
    quest_tracker: QuestTracker,
    quests: QuestManager,
    states: StateManager,
    save_system: Option<SaveSystem>,
    running: Rc<Cell<bool>>,
    subscriptions: Vec<(&'static str, EventHandler)>,
}

impl Game {
    /// Builds every subsystem and enters the main menu.
    ///
    /// An unusable save directory disables saving rather than failing; an
    /// unreadable quests file is an error.
    pub fn new(settings: &Settings, seed: u64) -> TapestryResult<Self> {
        let event_bus = EventBus::new();
        let notifications = NotificationManager::new(&event_bus);
        let quest_tracker = QuestTracker::new(&event_bus);
        let states = StateManager::new(&event_bus);
        let quests = QuestManager::new(&event_bus, states.persistent_data().clone());

        match &settings.quests_file {
            Some(path) => {
                let count = quests.load_quests_from_file(path)?;
                info!("Loaded {} quests from {}", count, path.display());
            }
            None => quests.load_builtin_quests(),
        }

        let save_system = match SaveSystem::new(&settings.save_dir) {
            Ok(saves) => Some(saves),
            Err(e) => {
                warn!("Saving disabled: {}", e);
                None
            }
        };

        let context = states.context();
        states.register_state(
            "main_menu",
            MainMenuState::new(context.clone(), save_system.clone()),
        );
        states.register_state(
            "world_exploration",
            WorldExplorationState::new(context.clone(), seed, settings.effective_encounter_chance()),
        );
        states.register_state("combat", CombatState::new(context.clone()));
        states.register_state("pause_menu", PauseMenuState::new(context, save_system.clone()));

        let running = Rc::new(Cell::new(true));
        let mut subscriptions = vec![(QUIT_GAME, quit_handler(&running))];
        if settings.auto_save {
            if let Some(saves) = &save_system {
                subscriptions.push((
                    QUEST_COMPLETED,
                    auto_save_handler(saves.clone(), states.persistent_data().clone()),
                ));
            }
        }
        for (event_type, handler) in &subscriptions {
            event_bus.subscribe(*event_type, handler.clone());
        }

        states.change_state("main_menu", None);
        info!("Game initialized with seed {}", seed);

        Ok(Self {
            event_bus,
            notifications,
            quest_tracker,
            quests,
            states,
            save_system,
            running,
            subscriptions,
        })
    }

    /// Forwards one input event to the top state.
    pub fn handle_input(&self, event: &InputEvent) -> bool {
        self.states.handle_event(event)
    }

    /// Advances the top state, then the overlays.
    pub fn update(&mut self, dt: f32) {
        self.states.update(dt);
        self.notifications.update(dt);
        self.quest_tracker.update(dt);
    }

    /// Draws the visible states bottom to top, then the overlays above them.
    pub fn render(&self, surface: &mut dyn Surface) {
        self.states.render(surface);
        self.quest_tracker.render(surface);
        self.notifications.render(surface);
    }

    /// Runs one whole frame: input, update, render.
    pub fn frame(&mut self, events: &[InputEvent], dt: f32, surface: &mut dyn Surface) {
        for event in events {
            self.handle_input(event);
        }
        self.update(dt);
        self.render(surface);
    }

    /// False once `quit_game` has been published.
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn state_manager(&self) -> &StateManager {
        &self.states
    }

    pub fn quest_manager(&self) -> &QuestManager {
        &self.quests
    }

    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }

    pub fn quest_tracker(&self) -> &QuestTracker {
        &self.quest_tracker
    }

    pub fn persistent(&self) -> &PersistentData {
        self.states.persistent_data()
    }

    pub fn save_system(&self) -> Option<&SaveSystem> {
        self.save_system.as_ref()
    }
}

fn quit_handler(running: &Rc<Cell<bool>>) -> EventHandler {
    let running = Rc::downgrade(running);
    EventHandler::named("game.quit", move |_| {
        if let Some(running) = running.upgrade() {
            info!("Quit requested");
            running.set(false);
        }
        Ok(())
    })
}

fn auto_save_handler(saves: SaveSystem, persistent: PersistentData) -> EventHandler {
    EventHandler::named("game.auto_save", move |payload| {
        let metadata = json!({"auto_save": true, "reason": payload.get("quest_id")});
        match saves.save_game(AUTO_SAVE_SLOT, &persistent.snapshot(), metadata.as_object().cloned()) {
            Ok(path) => info!("Auto-saved to {}", path.display()),
            Err(e) => error!("Auto-save failed: {}", e),
        }
        Ok(())
    })
}

impl Drop for Game {
    fn drop(&mut self) {
        for (event_type, handler) in &self.subscriptions {
            self.event_bus.unsubscribe(event_type, handler);
        }
    }
}
