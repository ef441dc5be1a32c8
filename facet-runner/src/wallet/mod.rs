//! Wallet Provider
//!
//! Supplies the signing wallet to the EVM endpoint as an explicit value.
//! There is no process-wide wallet object: whoever builds the resolver
//! decides which provider it gets.
//!
//! Only the environment-backed provider exists today (`PRIVATE_KEY`).

mod env_provider;

pub use env_provider::EnvWalletProvider;

use async_trait::async_trait;
use ethers::signers::LocalWallet;
use std::sync::Arc;

use crate::config::Config;
use crate::error::WorkflowError;

/// Trait for wallet providers - abstracts where the signing key comes from
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Get the wallet for signing transactions
    async fn get_wallet(&self) -> Result<LocalWallet, String>;

    /// Get the wallet address (lowercase hex, cached)
    fn get_address(&self) -> String;

    /// Get the mode name for logging
    fn mode_name(&self) -> &'static str;
}

/// Build the wallet provider described by the configuration
pub fn create_wallet_provider(config: &Config) -> Result<Arc<dyn WalletProvider>, WorkflowError> {
    let provider = EnvWalletProvider::from_private_key(&config.private_key)
        .map_err(WorkflowError::Config)?;

    log::info!(
        "Wallet provider initialized ({} mode): {}",
        provider.mode_name(),
        provider.get_address()
    );

    Ok(Arc::new(provider))
}
