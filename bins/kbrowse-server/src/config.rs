use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use cluster_memory::MemoryClusterConfig;
use kbrowse_engine::SearchConfig;

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "kbrowse-server", about = "Time-window message search over topic partitions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP search API
    Serve(ServeArgs),
    /// Run one search and print matches as JSON lines
    Search(SearchArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Path to TOML config file
    #[arg(long, default_value = "config.toml", env = "KBROWSE_CONFIG")]
    pub config: String,
}

#[derive(Args, Clone, Debug)]
pub struct SearchArgs {
    /// Path to TOML config file
    #[arg(long, default_value = "config.toml", env = "KBROWSE_CONFIG")]
    pub config: String,
    #[arg(long)]
    pub topic: String,
    /// message, key or key_and_message
    #[arg(long, default_value = "message")]
    pub kind: String,
    /// Value fragment (message, key_and_message) or exact key (key)
    #[arg(long, default_value = "")]
    pub value: String,
    /// Exact key for key_and_message queries
    #[arg(long)]
    pub key: Option<String>,
    /// Window start, Unix ms
    #[arg(long, default_value_t = 0)]
    pub from: i64,
    /// Window end, Unix ms (default: now)
    #[arg(long)]
    pub to: Option<i64>,
}

// ---- TOML Config ----

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cluster: MemoryClusterConfig,
    #[serde(default)]
    pub topics: Vec<TopicConfig>,
}

/// Topic created in the in-memory cluster at startup.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicConfig {
    pub name: String,
    #[serde(default = "default_partitions")]
    pub partitions: u32,
    /// Overrides `[cluster] retention_records` for this topic.
    #[serde(default)]
    pub retention_records: Option<usize>,
    /// JSON-lines file with records to load.
    #[serde(default)]
    pub seed: Option<String>,
}

fn default_api_port() -> u16 {
    9300
}

fn default_partitions() -> u32 {
    1
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        Self::parse(&content)
            .map_err(|e| ServerError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }

    pub fn parse(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}
