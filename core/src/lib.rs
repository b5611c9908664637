pub mod analysis;
pub mod api;
pub mod apply;
pub mod config;
pub mod error;
pub mod executor;
pub mod extract;
pub mod llm;
pub mod planner;
pub mod summary;
