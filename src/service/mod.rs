pub mod catalog;
pub mod engine;
pub mod export;
pub mod workflow;

pub use catalog::{CatalogIndex, DEFAULT_SEARCH_LIMIT};
pub use engine::ReconciliationEngine;
pub use workflow::{SessionPhase, SessionSnapshot, SessionWorkflow, SubmitOutcome};
