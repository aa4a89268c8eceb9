//! Overworld exploration.
//!
//! The player walks a grid between landmarks. Stepping onto a landmark for
//! the first time announces it, interacting talks to its NPC or starts a
//! battle, and every plain step may roll a random encounter.

use crate::events::{LOCATION_VISITED, NPC_TALKED};
use crate::input::InputEvent;
use crate::rendering::ui::{draw_panel, DIM_TEXT_COLOR, HIGHLIGHT_COLOR, TEXT_COLOR};
use crate::rendering::Surface;
use crate::states::{GameState, StateBase, StateContext, StateData};
use crate::world::{Direction, LandmarkKind, Position, WorldMap};
use log::{debug, info, warn};
use macroquad::color::Color;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

const TILE_SIZE: f32 = 20.0;
const GRASS: Color = Color::new(0.18, 0.36, 0.18, 1.0);
const EDGE: Color = Color::new(0.05, 0.05, 0.08, 1.0);
const PLAYER_COLOR: Color = Color::new(1.0, 0.85, 0.2, 1.0);
const ENCOUNTERS: [&str; 3] = ["wolf", "goblin", "bandit"];

fn landmark_color(kind: LandmarkKind) -> Color {
    match kind {
        LandmarkKind::Town => Color::new(0.75, 0.55, 0.3, 1.0),
        LandmarkKind::Dungeon => Color::new(0.45, 0.1, 0.1, 1.0),
        LandmarkKind::Site => Color::new(0.55, 0.55, 0.6, 1.0),
    }
}

pub struct WorldExplorationState {
    base: StateBase,
    world: Option<WorldMap>,
    player: Position,
    rng: StdRng,
    seed: u64,
    encounter_chance: f64,
    steps: u32,
}

impl WorldExplorationState {
    pub fn new(context: StateContext, seed: u64, encounter_chance: f64) -> Self {
        Self {
            base: StateBase::new(context),
            world: None,
            player: Position::origin(),
            rng: StdRng::seed_from_u64(seed),
            seed,
            encounter_chance: encounter_chance.clamp(0.0, 1.0),
            steps: 0,
        }
    }

    pub fn player_position(&self) -> Position {
        self.player
    }

    pub fn world(&self) -> Option<&WorldMap> {
        self.world.as_ref()
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Loads the world and player from persistent data, creating them for a
    /// fresh run.
    fn load_run(&mut self) {
        let persistent = self.base.context().persistent().clone();

        let world = match persistent.get_as::<WorldMap>("world") {
            Some(world) => world,
            None => {
                info!("Generating starter world with seed {}", self.seed);
                let world = WorldMap::starter(self.seed);
                if let Err(e) = persistent.set_as("world", &world) {
                    warn!("Could not store generated world: {}", e);
                }
                world
            }
        };

        if !matches!(persistent.get("player_character"), Some(Value::Object(_))) {
            let template = persistent.get("player_character_template").unwrap_or_default();
            persistent.set(
                "player_character",
                json!({
                    "name": template.get("name").cloned().unwrap_or_else(|| json!("Adventurer")),
                    "level": 1,
                    "xp": 0,
                    "gold": 0,
                    "hp": 30,
                    "max_hp": 30,
                }),
            );
        }

        self.player = persistent
            .get_as::<Position>("player_world_position")
            .filter(|position| world.contains(*position))
            .unwrap_or_else(|| world.spawn_point());
        self.world = Some(world);
    }

    /// Writes the world and player position back to persistent data.
    fn store_run(&self) {
        let persistent = self.base.context().persistent();
        if let Some(world) = &self.world {
            if let Err(e) = persistent.set_as("world", world) {
                warn!("Could not store world: {}", e);
            }
        }
        if let Err(e) = persistent.set_as("player_world_position", &self.player) {
            warn!("Could not store player position: {}", e);
        }
    }

    fn try_move(&mut self, direction: Direction) {
        let Some(world) = self.world.as_mut() else {
            return;
        };
        let target = self.player.step(direction);
        if !world.contains(target) {
            debug!("Blocked at world edge: {:?}", target);
            return;
        }
        self.player = target;
        self.steps += 1;

        if let Some(landmark) = world.landmark_at_mut(target) {
            if !landmark.visited {
                landmark.visited = true;
                let (id, name, description) = (
                    landmark.id.clone(),
                    landmark.name.clone(),
                    landmark.description.clone(),
                );
                let context = self.base.context();
                context.publish(LOCATION_VISITED, json!({"location_id": id}));
                context.notify(&format!("Discovered {}", name), &description, 3.0);
            }
            return;
        }

        if self.encounter_chance > 0.0 && self.rng.gen_bool(self.encounter_chance) {
            let enemy = ENCOUNTERS.choose(&mut self.rng).copied().unwrap_or("wolf");
            info!("Random encounter: {}", enemy);
            self.base.change_state("combat", encounter(enemy, None));
        }
    }

    fn interact(&mut self) {
        let Some(landmark) = self.world.as_ref().and_then(|w| w.landmark_at(self.player)) else {
            self.base
                .context()
                .notify("Nothing here", "There is nothing to interact with.", 1.5);
            return;
        };
        let context = self.base.context();

        match landmark.kind {
            LandmarkKind::Town => {
                let npc = landmark.npc.clone().unwrap_or_else(|| landmark.id.clone());
                context.publish(NPC_TALKED, json!({"npc_id": npc}));
                context.notify(&landmark.name, &format!("You speak with the {}.", npc.replace('_', " ")), 3.0);
            }
            LandmarkKind::Dungeon => {
                let enemy = landmark.enemy_type.clone().unwrap_or_else(|| "wolf".to_string());
                let location = landmark.id.clone();
                self.base.change_state("combat", encounter(&enemy, Some(&location)));
            }
            LandmarkKind::Site => {
                context.notify(&landmark.name, &landmark.description, 3.0);
            }
        }
    }
}

fn encounter(enemy_type: &str, location_id: Option<&str>) -> Option<StateData> {
    json!({
        "enemy_type": enemy_type,
        "location_id": location_id,
        "return_state": "world_exploration",
    })
    .as_object()
    .cloned()
}

impl GameState for WorldExplorationState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn enter(&mut self, data: Option<StateData>) {
        self.base.enter(data);
        self.load_run();
        info!("Entered world exploration at {:?}", self.player);
    }

    fn exit(&mut self) {
        self.store_run();
        self.base.exit();
    }

    // Saving from the pause menu reads persistent data while this state is paused
    fn pause(&mut self) {
        self.store_run();
        self.base.pause();
    }

    fn handle_event(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Move(direction) => self.try_move(*direction),
            InputEvent::Interact | InputEvent::Confirm => self.interact(),
            InputEvent::Pause => self
                .base
                .push_state("pause_menu", json!({"reason": "user"}).as_object().cloned()),
            InputEvent::Help => self.base.context().notify(
                "Help",
                "Arrows move, E interacts, Esc pauses.",
                4.0,
            ),
            InputEvent::Attack => return false,
        }
        true
    }

    fn render(&self, surface: &mut dyn Surface) {
        let Some(world) = &self.world else {
            return;
        };
        let (width, height) = surface.size();
        surface.fill(EDGE);

        let columns = (width / TILE_SIZE) as i32;
        let rows = (height / TILE_SIZE) as i32;
        let origin = Position::new(self.player.x - columns / 2, self.player.y - rows / 2);
        let to_screen = |position: Position| {
            (
                (position.x - origin.x) as f32 * TILE_SIZE,
                (position.y - origin.y) as f32 * TILE_SIZE,
            )
        };

        let (left, top) = to_screen(Position::origin());
        surface.draw_rect(
            left,
            top,
            world.width as f32 * TILE_SIZE,
            world.height as f32 * TILE_SIZE,
            GRASS,
        );

        for landmark in &world.landmarks {
            let (x, y) = to_screen(landmark.position);
            surface.draw_rect(x, y, TILE_SIZE, TILE_SIZE, landmark_color(landmark.kind));
            if landmark.visited {
                surface.draw_text(&landmark.name, x, y - 4.0, 16.0, TEXT_COLOR);
            }
        }

        let (x, y) = to_screen(self.player);
        surface.draw_rect(x + 3.0, y + 3.0, TILE_SIZE - 6.0, TILE_SIZE - 6.0, PLAYER_COLOR);

        let character = self
            .base
            .context()
            .persistent()
            .get("player_character")
            .unwrap_or_default();
        draw_panel(surface, 10.0, height - 70.0, 360.0, 60.0);
        surface.draw_text(
            &format!(
                "{}  Lv {}  XP {}  Gold {}",
                character.get("name").and_then(Value::as_str).unwrap_or("Adventurer"),
                character.get("level").and_then(Value::as_u64).unwrap_or(1),
                character.get("xp").and_then(Value::as_u64).unwrap_or(0),
                character.get("gold").and_then(Value::as_u64).unwrap_or(0),
            ),
            20.0,
            height - 45.0,
            20.0,
            HIGHLIGHT_COLOR,
        );
        let here = world
            .landmark_at(self.player)
            .map_or_else(|| format!("({}, {})", self.player.x, self.player.y), |l| l.name.clone());
        surface.draw_text(&here, 20.0, height - 22.0, 18.0, DIM_TEXT_COLOR);
    }
}
