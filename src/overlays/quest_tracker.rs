//! On-screen quest tracker.
//!
//! Keeps one record per quest id, built purely from quest lifecycle events.
//! Finished quests stay on screen as a banner for a short while, then drop off.

use crate::config::QUEST_BANNER_DURATION;
use crate::events::*;
use crate::overlays::Overlay;
use crate::quests::QuestStatus;
use crate::rendering::ui::{
    draw_panel, draw_progress_bar, COMPLETE_COLOR, DIM_TEXT_COLOR, FAILED_COLOR, HIGHLIGHT_COLOR,
    TEXT_COLOR,
};
use crate::rendering::Surface;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

const PANEL_WIDTH: f32 = 320.0;
const PANEL_MARGIN: f32 = 20.0;

/// What the tracker knows about one quest.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestRecord {
    pub quest_id: String,
    pub title: String,
    pub status: QuestStatus,
    pub progress: f32,
    /// One display line per objective, e.g. `Defeat wolves (1/3)`
    pub objectives: Vec<String>,
    /// Seconds left on screen once the quest has finished.
    pub linger: Option<f32>,
}

impl QuestRecord {
    fn from_payload(quest_id: &str, payload: &Value) -> Self {
        let mut record = Self {
            quest_id: quest_id.to_string(),
            title: String::new(),
            status: QuestStatus::Active,
            progress: 0.0,
            objectives: Vec::new(),
            linger: None,
        };
        record.apply(payload);
        record
    }

    fn apply(&mut self, payload: &Value) {
        self.title = payload.str_or("title", &self.quest_id).to_string();
        self.progress = payload.f64_or("progress", self.progress as f64).clamp(0.0, 1.0) as f32;
        if let Some(objectives) = payload.get("objectives").and_then(Value::as_array) {
            self.objectives = objectives.iter().map(objective_line).collect();
        }
    }

    fn finish(&mut self, status: QuestStatus) {
        self.status = status;
        self.linger = Some(QUEST_BANNER_DURATION);
    }
}

fn objective_line(objective: &Value) -> String {
    let description = objective.str_or("description", "Objective");
    let required = objective.u64_or("required", 1);
    if required > 1 {
        format!("{} ({}/{})", description, objective.u64_or("current", 0), required)
    } else if objective.bool_or("completed", false) {
        format!("{} (done)", description)
    } else {
        description.to_string()
    }
}

type Records = Rc<RefCell<Vec<QuestRecord>>>;

/// Shows active quests with their objectives, and banners for finished ones.
pub struct QuestTracker {
    records: Records,
    event_bus: EventBus,
    subscriptions: Vec<(&'static str, EventHandler)>,
}

impl QuestTracker {
    pub fn new(event_bus: &EventBus) -> Self {
        let records: Records = Rc::default();
        let subscriptions: Vec<(&'static str, EventHandler)> = [
            QUEST_ACTIVATED,
            QUEST_UPDATED,
            QUEST_OBJECTIVES_COMPLETE,
            QUEST_COMPLETED,
            QUEST_FAILED,
            NEW_GAME_STARTED,
            GAME_LOADED,
        ]
        .into_iter()
        .map(|event_type| {
            let handler = record_handler(event_type, Rc::downgrade(&records));
            event_bus.subscribe(event_type, handler.clone());
            (event_type, handler)
        })
        .collect();

        Self {
            records,
            event_bus: event_bus.clone(),
            subscriptions,
        }
    }

    /// Tracked quests in activation order.
    pub fn records(&self) -> Vec<QuestRecord> {
        self.records.borrow().clone()
    }

    pub fn record(&self, quest_id: &str) -> Option<QuestRecord> {
        self.records
            .borrow()
            .iter()
            .find(|record| record.quest_id == quest_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

fn record_handler(event_type: &'static str, records: Weak<RefCell<Vec<QuestRecord>>>) -> EventHandler {
    EventHandler::named(format!("quest_tracker.{}", event_type), move |payload| {
        let Some(records) = records.upgrade() else {
            return Ok(());
        };
        let mut records = records.borrow_mut();

        if event_type == NEW_GAME_STARTED || event_type == GAME_LOADED {
            records.clear();
            return Ok(());
        }

        let Some(quest_id) = payload.str_field("quest_id") else {
            return Ok(());
        };
        let existing = records.iter().position(|record| record.quest_id == quest_id);

        match (event_type, existing) {
            (QUEST_ACTIVATED, Some(index)) => {
                records[index] = QuestRecord::from_payload(quest_id, payload);
            }
            (_, None) => {
                let mut record = QuestRecord::from_payload(quest_id, payload);
                match event_type {
                    QUEST_COMPLETED => record.finish(QuestStatus::Completed),
                    QUEST_FAILED => record.finish(QuestStatus::Failed),
                    _ => {}
                }
                records.push(record);
            }
            (QUEST_COMPLETED, Some(index)) => {
                records[index].apply(payload);
                records[index].finish(QuestStatus::Completed);
            }
            (QUEST_FAILED, Some(index)) => {
                records[index].apply(payload);
                records[index].finish(QuestStatus::Failed);
            }
            (_, Some(index)) => records[index].apply(payload),
        }
        Ok(())
    })
}

impl Overlay for QuestTracker {
    fn update(&mut self, dt: f32) {
        let mut records = self.records.borrow_mut();
        for record in records.iter_mut() {
            if let Some(linger) = record.linger.as_mut() {
                *linger -= dt;
            }
        }
        records.retain(|record| record.linger.map_or(true, |linger| linger > 0.0));
    }

    fn render(&self, surface: &mut dyn Surface) {
        let records = self.records.borrow();
        if records.is_empty() {
            return;
        }

        let (width, _) = surface.size();
        let x = width - PANEL_WIDTH - PANEL_MARGIN;
        let lines: usize = records.iter().map(|r| 2 + r.objectives.len()).sum();
        let height = 40.0 + lines as f32 * 22.0;
        draw_panel(surface, x, PANEL_MARGIN, PANEL_WIDTH, height);
        surface.draw_text("Quests", x + 12.0, PANEL_MARGIN + 26.0, 24.0, HIGHLIGHT_COLOR);

        let mut y = PANEL_MARGIN + 52.0;
        for record in records.iter() {
            let (title, color) = match record.status {
                QuestStatus::Completed => (format!("Quest Complete: {}", record.title), COMPLETE_COLOR),
                QuestStatus::Failed => (format!("Quest Failed: {}", record.title), FAILED_COLOR),
                _ => (record.title.clone(), TEXT_COLOR),
            };
            surface.draw_text(&title, x + 12.0, y, 20.0, color);
            y += 8.0;
            draw_progress_bar(surface, x + 12.0, y, PANEL_WIDTH - 24.0, 6.0, record.progress, color);
            y += 14.0;
            for objective in &record.objectives {
                surface.draw_text(objective, x + 24.0, y + 4.0, 16.0, DIM_TEXT_COLOR);
                y += 22.0;
            }
            y += 8.0;
        }
    }
}

impl Drop for QuestTracker {
    fn drop(&mut self) {
        for (event_type, handler) in &self.subscriptions {
            self.event_bus.unsubscribe(event_type, handler);
        }
    }
}
