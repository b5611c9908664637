pub mod analyzer;
pub mod executor;
pub mod factory;
pub mod llm;
pub mod worker;
