// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "berth")]
#[command(about = "Self-hosted git-to-URL deployments for Docker and Podman")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output (for CI)
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// JSON lines output (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new berth.yml configuration file
    Init {
        /// Base domain applications are served under
        #[arg(long)]
        base_domain: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Deploy an application from a git repository
    Deploy {
        /// Repository URL or owner/repo shorthand
        repo: String,

        /// Application name (defaults to the repository name)
        #[arg(short, long)]
        name: Option<String>,

        /// Branch to deploy
        #[arg(short, long, default_value = "main")]
        branch: String,

        /// Build method: auto, dockerfile, or a framework template
        /// (nextjs, node, static)
        #[arg(short, long, default_value = "auto")]
        method: String,

        /// Environment variable for the application (KEY=VALUE, repeatable)
        #[arg(short, long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Custom domain to route to the application
        #[arg(short, long)]
        domain: Option<String>,
    },

    /// Show the status of deployed applications
    Status,

    /// Show container logs for an application
    Logs {
        /// Application subdomain
        subdomain: String,

        /// Number of recent lines to show
        #[arg(short, long, default_value = "200")]
        tail: u32,
    },

    /// Start a stopped application container
    Start {
        /// Application subdomain
        subdomain: String,
    },

    /// Stop a running application container
    Stop {
        /// Application subdomain
        subdomain: String,
    },

    /// Restart an application container
    Restart {
        /// Application subdomain
        subdomain: String,
    },

    /// Stop and remove an application's container
    Destroy {
        /// Application subdomain
        subdomain: String,
    },
}
