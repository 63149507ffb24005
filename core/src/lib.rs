pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod memory;
pub mod structured;
