// ABOUTME: Library root for berth - exposes public modules for the CLI and tests.
// ABOUTME: The main binary is in main.rs.

pub mod alloc;
pub mod build;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod output;
pub mod records;
pub mod runtime;
pub mod source;
pub mod tls;
pub mod types;
