//! Application layer - Use cases and orchestration

pub mod adopt;
pub mod command;
pub mod compare;

pub use adopt::{prepare_adoption, AdoptCommand, AdoptionOutcome, RefusalReason};
pub use command::{Command, CommandContext, CommandDispatcher, DirtyFlag, DirtyTracker};
pub use compare::CompareService;
