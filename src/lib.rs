//! barplan: adaptive planning engine for bodyweight bar training.
//!
//! The core is a pure, synchronous planning engine: history in, state and
//! prescriptions out. All I/O lives at the edges (`store`, the CLI).

pub mod adaptation;
pub mod config;
pub mod error;
pub mod exercises;
pub mod logging;
pub mod max_estimator;
pub mod metrics;
pub mod models;
pub mod onerm;
pub mod parse;
pub mod physiology;
pub mod planner;
pub mod store;
pub mod timeline;
pub mod views;

// Re-export the types most callers need
pub use config::EngineConfig;
pub use error::{BarplanError, Result};
pub use exercises::{get_exercise, ExerciseDefinition};
pub use models::{
    FitnessFatigueState, SessionPlan, SessionResult, SessionType, TimelineEntry, TrainingStatus,
    UserProfile,
};
pub use planner::{generate_plan, PlanOutcome, PlanRequest};
pub use store::HistoryStore;
pub use timeline::build_timeline;
