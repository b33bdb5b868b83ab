//! CLI argument definitions for kubeward-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kubeward admission decision daemon.
///
/// Loads policy settings, keeps the admission decision state current,
/// and evaluates admission reviews against the enforced policies.
#[derive(Parser, Debug)]
#[command(name = "kubeward-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to kubeward.toml configuration file.
    #[arg(short, long, default_value = "/etc/kubeward/kubeward.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// One-shot commands. Without a subcommand the daemon runs until signalled.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Evaluate a single AdmissionReview JSON file and print the response review.
    Review {
        /// Path to the AdmissionReview request JSON.
        request: PathBuf,

        /// Policy settings JSON (defaults to `admission.settings_path`).
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },
}
