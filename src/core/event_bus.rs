//! In-process fan-out of learning lifecycle events.
//!
//! Every event goes to the global channel and to each filtered subscriber
//! whose filter accepts it. Subscribers whose receivers are gone are dropped
//! on the next publish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::model::types::{DifficultyLevel, SessionStatus};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LearningEvent {
    SessionStarted(SessionStartedPayload),
    SessionEnded(SessionEndedPayload),
    DifficultyAdjusted(DifficultyAdjustedPayload),
    ConceptMastered(ConceptMasteredPayload),
    ProgressTracked(ProgressTrackedPayload),
}

impl LearningEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionStarted(_) => "SESSION_STARTED",
            Self::SessionEnded(_) => "SESSION_ENDED",
            Self::DifficultyAdjusted(_) => "DIFFICULTY_ADJUSTED",
            Self::ConceptMastered(_) => "CONCEPT_MASTERED",
            Self::ProgressTracked(_) => "PROGRESS_TRACKED",
        }
    }

    /// Learner and, when the event belongs to one, session.
    fn route(&self) -> (&str, Option<&str>) {
        match self {
            Self::SessionStarted(p) => (&p.user_id, Some(&p.session_id)),
            Self::SessionEnded(p) => (&p.user_id, Some(&p.session_id)),
            Self::DifficultyAdjusted(p) => (&p.user_id, p.session_id.as_deref()),
            Self::ConceptMastered(p) => (&p.user_id, Some(&p.session_id)),
            Self::ProgressTracked(p) => (&p.user_id, None),
        }
    }

    pub fn user_id(&self) -> &str {
        self.route().0
    }

    pub fn session_id(&self) -> Option<&str> {
        self.route().1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartedPayload {
    pub user_id: String,
    pub session_id: String,
    pub topic: String,
    pub difficulty: DifficultyLevel,
    pub planned_steps: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndedPayload {
    pub user_id: String,
    pub session_id: String,
    pub status: SessionStatus,
    pub concepts_covered: u32,
    pub duration_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyAdjustedPayload {
    pub user_id: String,
    pub session_id: Option<String>,
    pub concept: String,
    pub from_level: DifficultyLevel,
    pub to_level: DifficultyLevel,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMasteredPayload {
    pub user_id: String,
    pub session_id: String,
    pub concept: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressTrackedPayload {
    pub user_id: String,
    pub concept: String,
    pub mastery: f64,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub sequence: u64,
    pub event: LearningEvent,
    pub created_at: DateTime<Utc>,
}

/// `None` fields match anything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub event_types: Option<Vec<String>>,
}

impl EventFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Default::default()
        }
    }

    pub fn with_types(mut self, types: &[&str]) -> Self {
        self.event_types = Some(types.iter().map(|t| t.to_string()).collect());
        self
    }

    fn accepts(&self, event: &LearningEvent) -> bool {
        let (user_id, session_id) = event.route();
        self.user_id.as_deref().is_none_or(|wanted| wanted == user_id)
            && self
                .session_id
                .as_deref()
                .is_none_or(|wanted| Some(wanted) == session_id)
            && self
                .event_types
                .as_ref()
                .is_none_or(|types| types.iter().any(|t| t == event.event_type()))
    }
}

struct Subscriber {
    filter: EventFilter,
    sender: broadcast::Sender<EventEnvelope>,
}

pub struct EventBus {
    global: broadcast::Sender<EventEnvelope>,
    subscribers: RwLock<HashMap<Uuid, Subscriber>>,
    published: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        let (global, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            global,
            subscribers: RwLock::new(HashMap::new()),
            published: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: LearningEvent) {
        let sequence = self.published.fetch_add(1, Ordering::Relaxed) + 1;
        let envelope = EventEnvelope {
            id: Uuid::new_v4(),
            sequence,
            event,
            created_at: Utc::now(),
        };

        let mut delivered = 0usize;
        let mut closed = Vec::new();
        for (id, subscriber) in self.subscribers.read().iter() {
            if !subscriber.filter.accepts(&envelope.event) {
                continue;
            }
            match subscriber.sender.send(envelope.clone()) {
                Ok(_) => delivered += 1,
                Err(_) => closed.push(*id),
            }
        }
        if !closed.is_empty() {
            let mut subscribers = self.subscribers.write();
            for id in &closed {
                subscribers.remove(id);
            }
            trace!(dropped = closed.len(), "Dropped closed event subscribers");
        }

        let global = self.global.send(envelope.clone()).unwrap_or(0);
        debug!(
            event_type = envelope.event.event_type(),
            user_id = envelope.event.user_id(),
            sequence,
            filtered = delivered,
            global,
            "Event published"
        );
    }

    pub fn subscribe_global(&self) -> broadcast::Receiver<EventEnvelope> {
        self.global.subscribe()
    }

    pub fn subscribe_filtered(
        &self,
        filter: EventFilter,
    ) -> (Uuid, broadcast::Receiver<EventEnvelope>) {
        let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);
        let id = Uuid::new_v4();
        self.subscribers
            .write()
            .insert(id, Subscriber { filter, sender });
        debug!(subscriber_id = %id, "Filtered event subscription created");
        (id, receiver)
    }

    pub fn unsubscribe(&self, subscriber_id: &Uuid) -> bool {
        self.subscribers.write().remove(subscriber_id).is_some()
    }

    pub fn event_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> EventBusStats {
        let filtered_subscribers = self.subscribers.read().len();
        let global_subscribers = self.global.receiver_count();
        EventBusStats {
            total_events: self.event_count(),
            global_subscribers,
            filtered_subscribers,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBusStats {
    pub total_events: u64,
    pub global_subscribers: usize,
    pub filtered_subscribers: usize,
}
