pub mod api;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod controller;
mod handler;
pub mod models;
pub mod pcep;
mod registry;
pub mod session;
pub mod store;
pub mod topology;
pub mod utils;

pub use config::ServerConfig;
pub use controller::{Controller, ControllerError};
pub use handler::Server;
pub use store::{MemoryStore, SqliteStore, Store};
