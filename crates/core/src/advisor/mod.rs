//! The learning advisor: gathers a profile through conversation and produces
//! a learning path.

pub mod actions;
pub mod agent;
pub mod extraction;
pub mod memory;
pub mod persona;
pub mod prompt;

pub use actions::{ActionRecord, ActionScheduler, ActionType, ArtifactLocator};
pub use agent::AdvisorAgent;
pub use memory::{AdvisorMemory, Constraints, ExtractionData};
pub use persona::{Persona, PersonaDirectory};
