pub mod candidates;
pub mod error;
pub mod events;
pub mod filters;
pub mod generation;
pub mod inventory;
pub mod models;
pub mod pipeline;
pub mod plans;
pub mod scoring;
pub mod sources;
pub mod storage;
pub mod workspace;

// Re-export commonly used types for convenience.
pub use error::{PlannerError, PlannerResult};
pub use events::{ActivityEvent, ActivityLog, EventType};
pub use generation::GenerationRequest;
pub use inventory::InventoryManager;
pub use models::{Candidate, MealCategory, MealItem, MealPlan};
pub use pipeline::{AcceptRequest, DiscardStage, Pipeline, StageOptions};
pub use plans::{PlanEdit, PlanWorkspace};
pub use workspace::{AppConfig, PlannerContext, WorkspacePaths};
