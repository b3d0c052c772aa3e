// ABOUTME: Command module aggregator for the berth CLI.
// ABOUTME: Re-exports deploy, status, logs, and lifecycle command handlers.

mod deploy;
mod lifecycle;
mod logs;
mod runtime_connection;
mod status;

pub use deploy::{DeployArgs, deploy};
pub use lifecycle::{destroy, restart, start, stop};
pub use logs::logs;
pub use status::status;
