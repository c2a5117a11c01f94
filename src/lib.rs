pub mod adaptive;
pub mod auth;
pub mod cache;
pub mod config;
pub mod content;
pub mod core;
pub mod error;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod session;
pub mod state;
pub mod storage;
pub mod workers;

pub use error::{ErrorKind, LearningError, LearningResult};
pub use orchestrator::LearningOrchestrator;
