//! Command-line argument parsing for the unitdesk console.

use clap::{Parser, Subcommand};
use unitdesk_core::ResourceKind;

/// unitdesk - personnel, unit, position and vehicle data from the terminal
#[derive(Parser, Debug)]
#[command(name = "unitdesk")]
#[command(about = "Personnel, unit, position and vehicle management console")]
#[command(version)]
pub struct Cli {
    /// Print JSON instead of tab-separated rows
    #[arg(long, global = true)]
    pub json: bool,

    /// Backend base URL (overrides the config file)
    #[arg(long, env = "UNITDESK_API_URL", value_name = "URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List a collection
    ///
    /// Valid resources: departments, positions, employees, vehicles, requests
    List {
        #[arg(value_name = "RESOURCE")]
        resource: ResourceKind,
    },

    /// Search employees by name, service number, department or email
    Search {
        query: String,
    },

    /// Show the positions directly under a parent (root positions if omitted)
    Positions {
        #[arg(long, value_name = "ID")]
        parent: Option<String>,
    },

    /// Delete one item from a collection
    Delete {
        #[arg(value_name = "RESOURCE")]
        resource: ResourceKind,
        id: String,
    },

    /// Load every collection and report cache state
    Status,

    /// Show the stored configuration, or change and save it
    Config {
        /// Backend base URL to store
        #[arg(long, value_name = "URL")]
        set_api_url: Option<String>,

        /// Cache time-to-live in seconds
        #[arg(long, value_name = "SECS")]
        cache_ttl: Option<u64>,

        /// HTTP request timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
}
