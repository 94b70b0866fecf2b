// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the serve and status subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lander")]
#[command(about = "Receive gzipped tarballs over HTTP and atomically switch a `current` symlink to them")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the deployment receiver
    Serve {
        /// YAML config file (defaults to environment variables)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the listening port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show the promoted version and stored versions
    Status {
        /// YAML config file (defaults to environment variables)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Inspect this work root instead of the configured one
        #[arg(short, long)]
        work_dir: Option<PathBuf>,

        /// Print as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
