//! Timed on-screen notifications.

use crate::config::{
    DEFAULT_NOTIFICATION_DURATION, MAX_NOTIFICATIONS, NOTIFICATION_FADE_TIME,
    NOTIFICATION_SPACING, NOTIFICATION_X, NOTIFICATION_Y,
};
use crate::events::{EventBus, EventHandler, PayloadExt, SHOW_NOTIFICATION};
use crate::overlays::Overlay;
use crate::rendering::ui::{with_alpha, BORDER_COLOR, DIM_TEXT_COLOR, TEXT_COLOR};
use crate::rendering::Surface;
use log::debug;
use macroquad::color::BLACK;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// A message that fades out and expires on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub duration: f32,
    pub remaining: f32,
}

impl Notification {
    pub fn new(title: &str, message: &str, duration: f32) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            duration,
            remaining: duration,
        }
    }

    /// Opacity from 0 to 255: opaque until the final fade window, then linear.
    pub fn alpha(&self) -> u8 {
        if self.remaining >= NOTIFICATION_FADE_TIME {
            255
        } else {
            (255.0 * (self.remaining / NOTIFICATION_FADE_TIME)).clamp(0.0, 255.0) as u8
        }
    }

    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }
}

type Queue = Rc<RefCell<VecDeque<Notification>>>;

/// Shows `show_notification` events as stacked, fading panels.
///
/// At most [`MAX_NOTIFICATIONS`] are live at once; a new one evicts the oldest.
pub struct NotificationManager {
    notifications: Queue,
    event_bus: EventBus,
    handler: EventHandler,
}

impl NotificationManager {
    pub fn new(event_bus: &EventBus) -> Self {
        let notifications: Queue = Rc::default();
        let handler = show_handler(Rc::downgrade(&notifications));
        event_bus.subscribe(SHOW_NOTIFICATION, handler.clone());
        Self {
            notifications,
            event_bus: event_bus.clone(),
            handler,
        }
    }

    /// Adds a notification directly, bypassing the bus.
    pub fn show(&self, title: &str, message: &str, duration: f32) {
        push(&self.notifications, Notification::new(title, message, duration));
    }

    /// Live notifications, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.borrow().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.notifications.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.notifications.borrow_mut().clear();
    }
}

fn push(queue: &Queue, notification: Notification) {
    let mut queue = queue.borrow_mut();
    while queue.len() >= MAX_NOTIFICATIONS {
        queue.pop_front();
    }
    debug!(
        "Added notification: {} - {}",
        notification.title, notification.message
    );
    queue.push_back(notification);
}

fn show_handler(queue: Weak<RefCell<VecDeque<Notification>>>) -> EventHandler {
    EventHandler::named("notification_manager.show", move |payload: &Value| {
        let Some(queue) = queue.upgrade() else {
            return Ok(());
        };
        let empty = match payload {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if empty {
            return Ok(());
        }

        let notification = Notification::new(
            payload.str_or("title", "Notification"),
            payload.str_or("message", ""),
            payload.f64_or("duration", DEFAULT_NOTIFICATION_DURATION) as f32,
        );
        push(&queue, notification);
        Ok(())
    })
}

impl Overlay for NotificationManager {
    fn update(&mut self, dt: f32) {
        let mut queue = self.notifications.borrow_mut();
        for notification in queue.iter_mut() {
            notification.remaining -= dt;
        }
        queue.retain(|notification| !notification.is_expired());
    }

    fn render(&self, surface: &mut dyn Surface) {
        let queue = self.notifications.borrow();
        for (index, notification) in queue.iter().enumerate() {
            let x = NOTIFICATION_X;
            let y = NOTIFICATION_Y + index as f32 * NOTIFICATION_SPACING;
            let alpha = notification.alpha();

            let width = surface
                .text_width(&notification.title, 28.0)
                .max(surface.text_width(&notification.message, 24.0))
                + 20.0;
            surface.draw_rect(x, y, width, 70.0, with_alpha(BLACK, alpha.min(200)));
            surface.draw_rect_outline(x, y, width, 70.0, 2.0, with_alpha(BORDER_COLOR, alpha));
            surface.draw_text(
                &notification.title,
                x + 10.0,
                y + 28.0,
                28.0,
                with_alpha(TEXT_COLOR, alpha),
            );
            surface.draw_text(
                &notification.message,
                x + 10.0,
                y + 56.0,
                24.0,
                with_alpha(DIM_TEXT_COLOR, alpha),
            );
        }
    }
}

impl Drop for NotificationManager {
    fn drop(&mut self) {
        self.event_bus.unsubscribe(SHOW_NOTIFICATION, &self.handler);
    }
}
