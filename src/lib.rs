pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod service;

pub use client::BackendClient;
pub use config::AppConfig;
pub use error::{ReconcileError, ReconcileResult};
pub use service::{ReconciliationEngine, SessionWorkflow};
