// ABOUTME: Library root for lander - exposes the store, deploy pipeline and server.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
