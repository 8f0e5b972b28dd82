//! Storage plumbing shared by the engine: store handle, SQLite broker, schema,
//! configuration, clock and error type.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod schemas;
pub mod store;
pub mod time;
