//! Infrastructure layer - Configuration and persistence

pub mod config;
pub mod store;

pub use config::Config;
pub use store::DocumentStore;
