//! # Overlays
//!
//! Display managers drawn above the state stack.
//!
//! Overlays learn everything from events on the bus. They never look at the
//! state stack, so adding a new game state never requires touching them.

pub mod notifications;
pub mod quest_tracker;

pub use notifications::{Notification, NotificationManager};
pub use quest_tracker::{QuestRecord, QuestTracker};

use crate::rendering::Surface;

/// A per-frame display manager driven by the host after the state stack.
pub trait Overlay {
    /// Ages records by `dt` seconds and prunes expired ones.
    fn update(&mut self, dt: f32);

    fn render(&self, surface: &mut dyn Surface);
}
