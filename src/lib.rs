#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod app;
pub mod catalog;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod job;
pub mod prompt;
pub mod remote;

pub use config::Config;
pub use error::{ResearchError, Result};
