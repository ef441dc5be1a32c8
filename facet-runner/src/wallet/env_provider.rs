//! Environment-based Wallet Provider
//!
//! Wraps the key configured through `PRIVATE_KEY`.

use async_trait::async_trait;
use ethers::core::k256::ecdsa::SigningKey;
use ethers::signers::{LocalWallet, Signer};

use super::WalletProvider;

/// Wallet provider holding a key loaded at startup
pub struct EnvWalletProvider {
    wallet: LocalWallet,
    address: String,
}

impl EnvWalletProvider {
    /// Create provider from a private key string, with or without `0x`
    pub fn from_private_key(private_key: &str) -> Result<Self, String> {
        let private_key = private_key.trim();
        let key_hex = private_key.strip_prefix("0x").unwrap_or(private_key);

        let key_bytes = hex::decode(key_hex)
            .map_err(|e| format!("Invalid private key hex: {}", e))?;

        if key_bytes.len() != 32 {
            return Err(format!(
                "Invalid private key: expected 32 bytes, got {}",
                key_bytes.len()
            ));
        }

        let signing_key = SigningKey::from_bytes(key_bytes.as_slice().into())
            .map_err(|e| format!("Invalid private key: {}", e))?;

        let wallet = LocalWallet::from(signing_key);
        let address = format!("{:?}", wallet.address()).to_lowercase();

        Ok(Self { wallet, address })
    }
}

#[async_trait]
impl WalletProvider for EnvWalletProvider {
    async fn get_wallet(&self) -> Result<LocalWallet, String> {
        Ok(self.wallet.clone())
    }

    fn get_address(&self) -> String {
        self.address.clone()
    }

    fn mode_name(&self) -> &'static str {
        "env"
    }
}
