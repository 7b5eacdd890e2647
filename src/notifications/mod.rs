use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// How many notifications stay on screen before the oldest is dropped
pub const MAX_ACTIVE_NOTIFICATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Error,
    #[default]
    Info,
}

impl NotificationKind {
    pub fn label(self) -> &'static str {
        match self {
            NotificationKind::Error => "error",
            NotificationKind::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn new(message: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            kind,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, NotificationKind::Error)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, NotificationKind::Info)
    }
}

/// User-visible, dismissible notifications, oldest first
#[derive(Debug, Default)]
pub struct NotificationCenter {
    active: VecDeque<Notification>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a notification and return its id
    pub fn push(&mut self, notification: Notification) -> Uuid {
        let id = notification.id;
        tracing::debug!(
            kind = notification.kind.label(),
            message = %notification.message,
            "Showing notification"
        );
        self.active.push_back(notification);
        while self.active.len() > MAX_ACTIVE_NOTIFICATIONS {
            self.active.pop_front();
        }
        id
    }

    /// Returns false if the id is unknown (already dismissed or evicted)
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.active.len();
        self.active.retain(|n| n.id != id);
        self.active.len() != before
    }

    pub fn dismiss_all(&mut self) {
        self.active.clear();
    }

    pub fn active(&self) -> impl Iterator<Item = &Notification> {
        self.active.iter()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.active.back()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
