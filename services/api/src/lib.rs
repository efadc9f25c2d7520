//! Pathwise API Library Crate
//!
//! The HTTP host for the advisor and teacher agents: configuration, shared
//! state, handlers, action execution and routing. The `api` binary is a thin
//! wrapper around this library.

pub mod actions;
pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
