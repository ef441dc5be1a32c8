use serde_json::Value;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::abi::parse_u256;
use crate::error::WorkflowError;

/// Environment variable names
pub mod env_vars {
    pub const RPC_URL: &str = "RPC_URL";
    pub const NETWORK: &str = "NETWORK";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    pub const CHAIN_ID: &str = "CHAIN_ID";
    pub const ABIS_DIR: &str = "ABIS_DIR";
    pub const FACET_ABI: &str = "FACET_ABI";
    pub const FACET_ADDRESS: &str = "FACET_ADDRESS";
    pub const SUBMIT_FUNCTION: &str = "SUBMIT_FUNCTION";
    pub const SUBMIT_ARGS: &str = "SUBMIT_ARGS";
    pub const SUBMIT_VALUE: &str = "SUBMIT_VALUE";
    pub const QUERY_FUNCTION: &str = "QUERY_FUNCTION";
    pub const QUERY_ARGS: &str = "QUERY_ARGS";
    pub const RECEIPT_POLL_MS: &str = "RECEIPT_POLL_MS";
    pub const RECEIPT_TIMEOUT_SECS: &str = "RECEIPT_TIMEOUT_SECS";
    pub const EXPLORER_TX_URL: &str = "EXPLORER_TX_URL";
    pub const REPORT_PATH: &str = "REPORT_PATH";
}

#[derive(Clone, Debug)]
pub struct Config {
    pub rpc_url: String,
    pub network: String,
    pub private_key: String,
    /// Queried from the node when unset
    pub chain_id: Option<u64>,
    pub abis_dir: PathBuf,
    pub facet_abi: String,
    /// Falls back to the ABI file's address map when unset
    pub facet_address: Option<String>,
    pub submit_function: String,
    pub submit_args: Vec<Value>,
    /// Wei, decimal or 0x hex
    pub submit_value: String,
    pub query_function: String,
    pub query_args: Vec<Value>,
    pub receipt_poll_interval: Duration,
    /// None waits for the receipt indefinitely
    pub receipt_timeout: Option<Duration>,
    pub explorer_tx_url: Option<String>,
    pub report_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, WorkflowError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WorkflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let private_key = get(env_vars::PRIVATE_KEY)
            .ok_or_else(|| WorkflowError::config(format!("{} must be set", env_vars::PRIVATE_KEY)))?;

        let chain_id = match get(env_vars::CHAIN_ID) {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                WorkflowError::config(format!("{} must be a valid number, got '{}'", env_vars::CHAIN_ID, raw))
            })?),
            None => None,
        };

        let poll_ms = match get(env_vars::RECEIPT_POLL_MS) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                WorkflowError::config(format!("{} must be a valid number, got '{}'", env_vars::RECEIPT_POLL_MS, raw))
            })?,
            None => 1000,
        };
        if poll_ms == 0 {
            return Err(WorkflowError::config(format!("{} must be greater than 0", env_vars::RECEIPT_POLL_MS)));
        }

        let receipt_timeout = match get(env_vars::RECEIPT_TIMEOUT_SECS) {
            Some(raw) => Some(Duration::from_secs(raw.parse::<u64>().map_err(|_| {
                WorkflowError::config(format!(
                    "{} must be a valid number, got '{}'",
                    env_vars::RECEIPT_TIMEOUT_SECS,
                    raw
                ))
            })?)),
            None => None,
        };

        let submit_value = get(env_vars::SUBMIT_VALUE).unwrap_or_else(|| "0".to_string());
        parse_u256(&submit_value)
            .map_err(|e| WorkflowError::config(format!("{}: {}", env_vars::SUBMIT_VALUE, e)))?;

        Ok(Self {
            rpc_url: get(env_vars::RPC_URL).unwrap_or_else(|| "http://127.0.0.1:8545".to_string()),
            network: get(env_vars::NETWORK).unwrap_or_else(|| "localhost".to_string()),
            private_key,
            chain_id,
            abis_dir: get(env_vars::ABIS_DIR).map(PathBuf::from).unwrap_or_else(default_abis_dir),
            facet_abi: get(env_vars::FACET_ABI).unwrap_or_else(|| "CalculatorFacet".to_string()),
            facet_address: get(env_vars::FACET_ADDRESS),
            submit_function: get(env_vars::SUBMIT_FUNCTION).unwrap_or_else(|| "subtract".to_string()),
            submit_args: parse_args(env_vars::SUBMIT_ARGS, get(env_vars::SUBMIT_ARGS), "[8, 1]")?,
            submit_value,
            query_function: get(env_vars::QUERY_FUNCTION).unwrap_or_else(|| "getResult".to_string()),
            query_args: parse_args(env_vars::QUERY_ARGS, get(env_vars::QUERY_ARGS), "[]")?,
            receipt_poll_interval: Duration::from_millis(poll_ms),
            receipt_timeout,
            explorer_tx_url: get(env_vars::EXPLORER_TX_URL).map(|u| u.trim_end_matches('/').to_string()),
            report_path: get(env_vars::REPORT_PATH).map(PathBuf::from),
        })
    }
}

/// Determine abis directory
fn default_abis_dir() -> PathBuf {
    env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("abis")
}

/// Positional arguments are a JSON array
fn parse_args(key: &str, raw: Option<String>, default: &str) -> Result<Vec<Value>, WorkflowError> {
    let raw = raw.unwrap_or_else(|| default.to_string());
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(values)) => Ok(values),
        Ok(other) => Err(WorkflowError::config(format!("{} must be a JSON array, got {}", key, other))),
        Err(e) => Err(WorkflowError::config(format!("{} is not valid JSON: {}", key, e))),
    }
}
