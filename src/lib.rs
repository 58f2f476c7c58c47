//! Intake flow: branching therapy intake questionnaire core.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod intake;
pub mod session;
pub mod store;
