//! Traffic Split Manager CLI
//!
//! A command-line tool for declaring traffic-split rules and deploying
//! them into the service mesh.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::rules;

/// Traffic Split Manager CLI
#[derive(Parser)]
#[command(name = "tsm")]
#[command(author, version, about = "CLI for the Traffic Split Manager", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via TSM_API_URL env var)
    #[arg(long, env = "TSM_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List traffic rules
    List,

    /// Show a single traffic rule
    Get {
        /// Rule ID
        id: String,
    },

    /// Create a traffic rule
    Create {
        /// Service the split applies to
        #[arg(long)]
        service: String,

        /// First version name
        #[arg(long, default_value = "v1")]
        version1: String,

        /// Second version name
        #[arg(long, default_value = "v2")]
        version2: String,

        /// Weight for the first version (0-100)
        #[arg(long)]
        weight1: u32,

        /// Weight for the second version (0-100)
        #[arg(long)]
        weight2: u32,

        /// Rule strategy (WEIGHTED, HEADER_MATCH, PATH_BASED)
        #[arg(long, default_value = "WEIGHTED")]
        rule_type: String,
    },

    /// Delete a traffic rule
    Delete {
        /// Rule ID
        id: String,
    },

    /// Deploy a rule into the mesh
    Deploy {
        /// Rule ID
        id: String,
    },

    /// Show the live Kubernetes Service behind a rule
    Status {
        /// Rule ID
        id: String,
    },
}

const DEFAULT_API_URL: &str = "http://localhost:4000";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // flag/env wins, then the config file, then the default
    let file_config = config::Config::load().unwrap_or_default();
    let api_url = cli
        .api_url
        .or(file_config.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    if cli.verbose {
        output::print_info(&format!("Using API at {}", api_url));
    }

    let client = client::ApiClient::new(&api_url)?;

    match cli.command {
        Commands::List => rules::list(&client, cli.format).await,
        Commands::Get { id } => rules::get(&client, &id, cli.format).await,
        Commands::Create {
            service,
            version1,
            version2,
            weight1,
            weight2,
            rule_type,
        } => {
            let payload = client::RulePayload {
                service_name: service,
                version1_name: version1,
                version2_name: version2,
                version1_weight: weight1,
                version2_weight: weight2,
                rule_type,
            };
            rules::create(&client, payload, cli.format).await
        }
        Commands::Delete { id } => rules::delete(&client, &id).await,
        Commands::Deploy { id } => rules::deploy(&client, &id, cli.format).await,
        Commands::Status { id } => rules::status(&client, &id, cli.format).await,
    }
}
