//! Configuration management for the Mint Service
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which replay store to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local store, lost on restart (development only)
    Memory,
    /// Redis, using `SET NX` for the atomic commit
    Redis,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => anyhow::bail!("unknown STORE_BACKEND {:?} (expected memory/redis)", other),
        }
    }
}

/// Which ledger the minted transfers go to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    /// In-process ledger (development/testing)
    Memory,
    /// Ethereum-style JSON-RPC node
    Rpc,
}

impl FromStr for LedgerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rpc" => Ok(Self::Rpc),
            other => anyhow::bail!("unknown LEDGER_BACKEND {:?} (expected memory/rpc)", other),
        }
    }
}

/// What to do when no nullifier can be resolved for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingNullifierPolicy {
    /// Refuse the mint
    Reject,
    /// Mint without replay protection, logging a warning every time
    Degraded,
}

impl FromStr for MissingNullifierPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "degraded" => Ok(Self::Degraded),
            other => anyhow::bail!(
                "unknown MISSING_NULLIFIER_POLICY {:?} (expected reject/degraded)",
                other
            ),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// Replay store backend
    pub store_backend: StoreBackend,

    /// Redis connection URL (used when `store_backend` is Redis)
    pub redis_url: String,

    /// Ledger backend
    pub ledger_backend: LedgerBackend,

    /// JSON-RPC endpoint of the ledger node (used when `ledger_backend` is Rpc)
    pub ledger_rpc_url: Option<String>,

    /// Chain id of the in-memory ledger
    pub chain_id: u64,

    /// Hex-encoded secp256k1 private key of the minting identity
    pub minter_private_key: String,

    /// Verifier program followed by its leading arguments
    pub verifier_command: Vec<String>,

    /// Upper bound on a single verifier run
    pub verifier_timeout_secs: u64,

    /// Accept the `mock-proof-data` fixture without running the verifier
    pub allow_fixture_proofs: bool,

    /// Behaviour when no nullifier can be resolved
    pub missing_nullifier_policy: MissingNullifierPolicy,

    /// Roll back the nullifier commit when issuance fails
    pub release_on_issue_failure: bool,

    /// Deadline for a whole mint request
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8090".to_string())
                .parse()
                .context("Invalid API_PORT")?,

            store_backend: env::var("STORE_BACKEND")
                .unwrap_or_else(|_| "memory".to_string())
                .parse()?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),

            ledger_backend: env::var("LEDGER_BACKEND")
                .unwrap_or_else(|_| "memory".to_string())
                .parse()?,

            ledger_rpc_url: env::var("LEDGER_RPC_URL").ok(),

            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| "1337".to_string())
                .parse()
                .context("Invalid CHAIN_ID")?,

            minter_private_key: env::var("MINTER_PRIVATE_KEY").unwrap_or_default(),

            verifier_command: env::var("VERIFIER_COMMAND")
                .unwrap_or_else(|_| "bb verify".to_string())
                .split_whitespace()
                .map(str::to_string)
                .collect(),

            verifier_timeout_secs: env::var("VERIFIER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .context("Invalid VERIFIER_TIMEOUT_SECS")?,

            allow_fixture_proofs: parse_flag("ALLOW_FIXTURE_PROOFS", false)?,

            missing_nullifier_policy: env::var("MISSING_NULLIFIER_POLICY")
                .unwrap_or_else(|_| "reject".to_string())
                .parse()?,

            release_on_issue_failure: parse_flag("RELEASE_ON_ISSUE_FAILURE", true)?,

            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid REQUEST_TIMEOUT_SECS")?,
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        if self.minter_private_key.is_empty() {
            anyhow::bail!("MINTER_PRIVATE_KEY is required");
        }

        if self.verifier_command.is_empty() {
            anyhow::bail!("VERIFIER_COMMAND must name a program");
        }

        if self.verifier_timeout_secs == 0 {
            anyhow::bail!("VERIFIER_TIMEOUT_SECS must be greater than 0");
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than 0");
        }

        if self.ledger_backend == LedgerBackend::Rpc && self.ledger_rpc_url.is_none() {
            anyhow::bail!("LEDGER_RPC_URL is required when LEDGER_BACKEND=rpc");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    pub fn verifier_timeout(&self) -> Duration {
        Duration::from_secs(self.verifier_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_flag(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(v) => match v.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => anyhow::bail!("Invalid {} (expected true/false)", name),
        },
        Err(_) => Ok(default),
    }
}
