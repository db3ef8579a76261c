//! Notification delivery.
//!
//! The engine only produces semantic [`Event`]s. Turning them into a popup,
//! a sound or an email is the sink's job. Delivery is fire-and-forget: the
//! [`NotificationDispatcher`] queues events on an unbounded channel and a
//! background task drains them, so a slow sink never holds up a stop.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::{Event, LimitKind};

/// Which cue a sink should play, if it plays sounds at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundHint {
    Start,
    Stop,
    Warning,
    Over,
}

impl SoundHint {
    pub fn file_name(self) -> &'static str {
        match self {
            SoundHint::Start => "start.wav",
            SoundHint::Stop => "stop.wav",
            SoundHint::Warning => "warning.wav",
            SoundHint::Over => "over.wav",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub sound: Option<SoundHint>,
}

impl Notification {
    pub fn from_event(event: &Event) -> Self {
        match event {
            Event::SessionStarted { username, at, .. } => Self {
                title: "Session Started".into(),
                body: format!("{username} started playing at {}.", at.format("%H:%M")),
                sound: Some(SoundHint::Start),
            },
            Event::SessionStopped {
                username, duration, ..
            } => Self {
                title: "Session Stopped".into(),
                body: format!("{username} stopped playing after {duration}."),
                sound: Some(SoundHint::Stop),
            },
            Event::LimitReached {
                username,
                kind: LimitKind::Daily,
                limit_minutes,
                usage_minutes,
                ..
            } => Self {
                title: "Daily Limit Reached!".into(),
                body: format!(
                    "{username} has played {usage_minutes} minutes today, \
                     reaching the daily limit of {limit_minutes} minutes."
                ),
                sound: Some(SoundHint::Over),
            },
            Event::LimitReached {
                username,
                kind: LimitKind::Block,
                limit_minutes,
                rest_minutes,
                ..
            } => {
                let rest = rest_minutes.unwrap_or(crate::user::DEFAULT_REST_MINUTES);
                Self {
                    title: "Play Time Limit Reached!".into(),
                    body: format!(
                        "{username} has played for {limit_minutes} minutes. \
                         Time for a {rest} minute break."
                    ),
                    sound: Some(SoundHint::Warning),
                }
            }
            Event::RestEnded { username, .. } => Self {
                title: "Break Time Ended!".into(),
                body: format!("{username} can play again."),
                sound: None,
            },
        }
    }
}

/// Delivers a notification to a human. Implementations must not panic.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Receives engine events as they are committed.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Queues events for a sink running on its own task.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<Event>,
}

impl NotificationDispatcher {
    /// Spawn the drain task on the current tokio runtime.
    ///
    /// The task ends once every dispatcher clone has been dropped and the
    /// queue is empty.
    pub fn spawn(sink: Arc<dyn NotificationSink>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let notification = Notification::from_event(&event);
                debug!(user = %event.user_id(), title = %notification.title, "delivering notification");
                sink.notify(&notification);
            }
        });
        (Self { tx }, task)
    }
}

impl EventSink for NotificationDispatcher {
    fn emit(&self, event: Event) {
        if let Err(err) = self.tx.send(event) {
            warn!(user = %err.0.user_id(), "notification task has stopped; event dropped");
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: Mutex<Vec<Event>>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl EventSink for EventBuffer {
    fn emit(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
