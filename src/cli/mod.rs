//! CLI module - Command-line interface for Quotarr
//!
//! This module provides a structured CLI using clap for argument parsing.

use clap::{Parser, Subcommand};

/// Quotarr - Subscription & quota tracker for a VPN config provisioning service
#[derive(Parser)]
#[command(name = "quotarr")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as background daemon with the subscription scheduler
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Run a single subscription scan and exit
    #[command(alias = "-s", alias = "--scan")]
    Scan,

    /// Show the full entitlement snapshot for a user
    #[command(alias = "e")]
    Entitlement {
        /// Numeric user id
        user_id: i64,
    },

    /// Show how many more configs a user may create
    #[command(alias = "q")]
    Quota {
        /// Numeric user id
        user_id: i64,
    },

    /// List a user's provisioned configs
    #[command(alias = "ls")]
    Configs {
        /// Numeric user id
        user_id: i64,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}
