//! # World Module
//!
//! Overworld representation shared by the exploration and combat states.
//!
//! The world is a bounded grid with a handful of named landmarks. It is stored
//! in the persistent data under `world` so it survives every stack replacement
//! and every save.

use serde::{Deserialize, Serialize};

/// A cell on the overworld grid.
///
/// # Examples
///
/// ```
/// use tapestry::{Direction, Position};
///
/// let pos = Position::new(10, 5);
/// assert_eq!(pos.step(Direction::North), Position::new(10, 4));
/// assert_eq!(pos.manhattan_distance(Position::new(13, 9)), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::new(0, 0)
    }

    pub fn manhattan_distance(self, other: Position) -> u32 {
        ((self.x - other.x).abs() + (self.y - other.y).abs()) as u32
    }

    /// The neighbouring cell in `direction`.
    pub fn step(self, direction: Direction) -> Position {
        self + direction.to_delta()
    }
}

impl std::ops::Add for Position {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Position {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Grid movement and menu navigation directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn to_delta(self) -> Position {
        match self {
            Direction::North => Position::new(0, -1),
            Direction::South => Position::new(0, 1),
            Direction::East => Position::new(1, 0),
            Direction::West => Position::new(-1, 0),
        }
    }

    /// Returns None unless `delta` is a unit cardinal step.
    pub fn from_delta(delta: Position) -> Option<Direction> {
        match (delta.x, delta.y) {
            (0, -1) => Some(Direction::North),
            (0, 1) => Some(Direction::South),
            (1, 0) => Some(Direction::East),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }

    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
        ]
    }
}

/// What happens when the player interacts at a landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkKind {
    /// Somewhere with people to talk to.
    Town,
    /// Somewhere hostile; interacting starts a battle.
    Dungeon,
    #[default]
    Site,
}

/// A named point of interest on the overworld.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub id: String,
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub kind: LandmarkKind,
    #[serde(default)]
    pub description: String,
    /// NPC met when interacting in a town.
    #[serde(default)]
    pub npc: Option<String>,
    /// Enemy faced when interacting at a dungeon.
    #[serde(default)]
    pub enemy_type: Option<String>,
    #[serde(default)]
    pub visited: bool,
}

impl Landmark {
    pub fn new(id: &str, name: &str, position: Position, kind: LandmarkKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            position,
            kind,
            description: String::new(),
            npc: None,
            enemy_type: None,
            visited: false,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_npc(mut self, npc: &str) -> Self {
        self.npc = Some(npc.to_string());
        self
    }

    pub fn with_enemy(mut self, enemy_type: &str) -> Self {
        self.enemy_type = Some(enemy_type.to_string());
        self
    }
}

/// The overworld: a bounded grid plus its landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldMap {
    pub width: i32,
    pub height: i32,
    pub seed: u64,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
}

impl WorldMap {
    /// Creates an empty world of the given size.
    pub fn new(width: i32, height: i32, seed: u64) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            seed,
            landmarks: Vec::new(),
        }
    }

    /// The world a new game starts in.
    pub fn starter(seed: u64) -> Self {
        let mut world = Self::new(
            crate::config::WORLD_WIDTH,
            crate::config::WORLD_HEIGHT,
            seed,
        );
        let center = world.spawn_point();
        world.landmarks = vec![
            Landmark::new("village", "Oakvale", center + Position::new(2, 0), LandmarkKind::Town)
                .with_description("A quiet farming village.")
                .with_npc("village_elder"),
            Landmark::new(
                "old_ruins",
                "Old Ruins",
                center + Position::new(-6, -4),
                LandmarkKind::Site,
            )
            .with_description("Crumbling stones older than the kingdom."),
            Landmark::new(
                "wolf_den",
                "Wolf Den",
                center + Position::new(8, 5),
                LandmarkKind::Dungeon,
            )
            .with_description("Something growls in the dark.")
            .with_enemy("wolf"),
        ];
        world
    }

    /// Where the player stands when no position has been saved.
    pub fn spawn_point(&self) -> Position {
        Position::new(self.width / 2, self.height / 2)
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0 && position.y >= 0 && position.x < self.width && position.y < self.height
    }

    pub fn landmark_at(&self, position: Position) -> Option<&Landmark> {
        self.landmarks.iter().find(|l| l.position == position)
    }

    pub fn landmark_at_mut(&mut self, position: Position) -> Option<&mut Landmark> {
        self.landmarks.iter_mut().find(|l| l.position == position)
    }

    pub fn landmark(&self, id: &str) -> Option<&Landmark> {
        self.landmarks.iter().find(|l| l.id == id)
    }
}
