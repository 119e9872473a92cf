pub mod api;
pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod llm;
pub mod providers;

// Re-export commonly used items
pub use database::DocumentStore;
pub use llm::{Oracle, QueryPipeline};
