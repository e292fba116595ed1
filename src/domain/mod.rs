//! Domain layer - Annotation models and merge logic

pub mod alignment;
pub mod comparison;
pub mod document;
pub mod manager;
pub mod processor;
pub mod schema;
pub mod tag;

pub use alignment::{AlignPolicy, AlignmentEngine, ComparisonData};
pub use comparison::ComparisonModel;
pub use document::{Document, DocumentType};
pub use manager::TagManager;
pub use processor::TagProcessor;
pub use schema::{SchemaLookup, TagSchema};
pub use tag::{Tag, TagRef};
