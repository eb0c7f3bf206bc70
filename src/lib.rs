//! Terminal console for the PaySim payments sandbox.
//!
//! Pages are addressed by path (`/`, `/transactions`, `/webhooks`, `/api-docs`) and
//! rendered from cached queries against the sandbox REST API.

pub mod api;
pub mod commands;
pub mod config;
pub mod console;
pub mod models;
pub mod query;
pub mod services;
pub mod utils;

pub use config::Config;
pub use console::Console;
