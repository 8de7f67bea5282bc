//! Storage Layer
//!
//! Handles all data persistence: the job store contract with its SQLite and
//! in-memory implementations, and the JSON config file.

pub mod config;
pub mod database;
pub mod memory;
pub mod store;

pub use config::*;
pub use database::*;
pub use memory::*;
pub use store::*;
