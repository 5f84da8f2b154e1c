//! Command-line interface for labflow.

mod commands;

use clap::{Parser, Subcommand};

/// Labflow - clinic and laboratory administration backend
#[derive(Parser)]
#[command(name = "labflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    #[command(alias = "daemon")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Create an active administrator, or promote an existing account
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Defaults to the username
        #[arg(long)]
        full_name: Option<String>,
    },

    /// Print the price of a plan for a number of months
    Price {
        /// basic, premium or enterprise
        plan: String,
        months: u32,
    },
}

pub use commands::*;
