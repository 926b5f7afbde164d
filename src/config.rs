//! Client configuration
//!
//! Loaded from TOML files with environment variable overrides, mirroring the
//! sections of the submission pipeline: network (node table, timeouts),
//! retry, chunking, and execution.

use crate::types::AccountId;
use serde::{Deserialize, Serialize};

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Node table and transport timeouts
    pub network: NetworkConfig,

    /// Dispatch retry/backoff ceilings
    #[serde(default)]
    pub retry: RetrySection,

    /// Oversized-payload chunking limits
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Receipt/record polling behavior
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// One consensus node: ledger account plus network address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEntry {
    /// Node account number (shard/realm fixed at 0)
    pub account: u64,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Address-to-node table, supplied externally
    pub nodes: Vec<NodeEntry>,

    /// Per-call timeout for dispatch and poll requests
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Consecutive failures before a node enters cooldown
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u64,

    /// Cooldown period for an unhealthy node, seconds
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    /// Maximum dispatch attempts per logical submission
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum payload bytes per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Hard ceiling on chunks per logical message
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Treat a definite non-success receipt status as a hard error.
    ///
    /// When false, the receipt is returned as a finished result carrying the
    /// failure code for the caller to branch on.
    #[serde(default = "default_true")]
    pub validate_receipt_status: bool,

    /// Maximum receipt polls per dispatch attempt
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

// Default value functions
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_failure_threshold() -> u64 {
    3
}
fn default_cooldown_secs() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    5
}
fn default_base_backoff_ms() -> u64 {
    250
}
fn default_max_backoff_ms() -> u64 {
    16_000
}
fn default_chunk_size() -> usize {
    1024
}
fn default_max_chunks() -> usize {
    20
}
fn default_max_polls() -> u32 {
    10
}
fn default_true() -> bool {
    true
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_chunks: default_max_chunks(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            validate_receipt_status: default_true(),
            max_polls: default_max_polls(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides applied first
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_file(path)
    }

    /// Configuration over an explicit node table, defaults elsewhere
    pub fn for_nodes(nodes: Vec<NodeEntry>) -> Self {
        Self {
            network: NetworkConfig {
                nodes,
                request_timeout_ms: default_request_timeout_ms(),
                failure_threshold: default_failure_threshold(),
                cooldown_secs: default_cooldown_secs(),
            },
            retry: RetrySection::default(),
            chunking: ChunkingConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.network.nodes.is_empty() {
            anyhow::bail!("network.nodes must list at least one node");
        }
        if self.chunking.chunk_size == 0 {
            anyhow::bail!("chunking.chunk_size must be greater than zero");
        }
        if self.chunking.max_chunks == 0 {
            anyhow::bail!("chunking.max_chunks must be greater than zero");
        }
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be greater than zero");
        }
        Ok(())
    }

    pub fn node_accounts(&self) -> Vec<AccountId> {
        self.network.nodes.iter().map(|n| AccountId(n.account)).collect()
    }
}
