mod event_bus;

pub use event_bus::{
    ConceptMasteredPayload, DifficultyAdjustedPayload, EventBus, EventBusStats, EventEnvelope,
    EventFilter, LearningEvent, ProgressTrackedPayload, SessionEndedPayload,
    SessionStartedPayload,
};
