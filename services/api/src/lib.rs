//! Parley API Library Crate
//!
//! This library contains the HTTP boundary of the Parley chat agent: the
//! configuration, application state, API handlers and routing. The `api`
//! binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod router;
pub mod state;
