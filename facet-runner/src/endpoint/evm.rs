//! EVM JSON-RPC endpoint built on ethers.
//!
//! Submissions are signed locally by the configured wallet and sent through
//! `SignerMiddleware`, which fills nonce, gas and EIP-1559 fees.

use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip1559::Eip1559TransactionRequest;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, H256, U64};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{EndpointResolver, FacetEndpoint, FinalizedOutcome, OperationCall, PendingOperation, ResultValue};
use crate::abi::{decode_return, encode_call, parse_u256, FacetAbi};
use crate::config::Config;
use crate::error::WorkflowError;
use crate::wallet::WalletProvider;

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Resolves contract addresses on one JSON-RPC node
pub struct EvmResolver {
    provider: Provider<Http>,
    facet: Arc<FacetAbi>,
    wallet_provider: Arc<dyn WalletProvider>,
    chain_id: Option<u64>,
    poll_interval: Duration,
    receipt_timeout: Option<Duration>,
    explorer_tx_url: Option<String>,
}

impl EvmResolver {
    pub fn new(
        config: &Config,
        facet: FacetAbi,
        wallet_provider: Arc<dyn WalletProvider>,
    ) -> Result<Self, WorkflowError> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| WorkflowError::config(format!("Invalid RPC URL '{}': {}", config.rpc_url, e)))?;

        Ok(Self {
            provider,
            facet: Arc::new(facet),
            wallet_provider,
            chain_id: config.chain_id,
            poll_interval: config.receipt_poll_interval,
            receipt_timeout: config.receipt_timeout,
            explorer_tx_url: config.explorer_tx_url.clone(),
        })
    }

    async fn chain_id(&self) -> Result<u64, WorkflowError> {
        if let Some(id) = self.chain_id {
            return Ok(id);
        }
        let id = self.provider.get_chainid().await
            .map_err(|e| WorkflowError::transport(format!("Failed to query chain id: {}", e)))?;
        Ok(id.as_u64())
    }
}

#[async_trait]
impl EndpointResolver for EvmResolver {
    async fn resolve(&self, address: &str) -> Result<Arc<dyn FacetEndpoint>, WorkflowError> {
        let contract: Address = address.parse()
            .map_err(|_| WorkflowError::transport(format!("Invalid contract address: {}", address)))?;

        let code = self.provider.get_code(contract, None).await
            .map_err(|e| WorkflowError::transport(format!("Failed to look up {}: {}", address, e)))?;
        if code.as_ref().is_empty() {
            return Err(WorkflowError::transport(format!("No contract deployed at {}", address)));
        }

        let chain_id = self.chain_id().await?;
        let wallet = self.wallet_provider.get_wallet().await
            .map_err(WorkflowError::Transport)?
            .with_chain_id(chain_id);

        log::info!(
            "[evm] Resolved {} at {} (chain {}, signer {})",
            self.facet.name, address, chain_id, self.wallet_provider.get_address()
        );

        Ok(Arc::new(EvmEndpoint {
            address: address.to_string(),
            contract,
            facet: self.facet.clone(),
            client: SignerMiddleware::new(self.provider.clone(), wallet),
            poll_interval: self.poll_interval,
            receipt_timeout: self.receipt_timeout,
            explorer_tx_url: self.explorer_tx_url.clone(),
        }))
    }
}

/// Handle to one deployed facet
pub struct EvmEndpoint {
    address: String,
    contract: Address,
    facet: Arc<FacetAbi>,
    client: SignerClient,
    poll_interval: Duration,
    receipt_timeout: Option<Duration>,
    explorer_tx_url: Option<String>,
}

impl EvmEndpoint {
    fn calldata(&self, call: &OperationCall) -> Result<(&ethers::abi::Function, Vec<u8>), WorkflowError> {
        let function = self.facet.function(&call.function).map_err(WorkflowError::Transport)?;
        let calldata = encode_call(function, &call.args).map_err(WorkflowError::Transport)?;
        Ok((function, calldata))
    }
}

#[async_trait]
impl FacetEndpoint for EvmEndpoint {
    fn address(&self) -> &str {
        &self.address
    }

    fn facet_name(&self) -> &str {
        &self.facet.name
    }

    fn explorer_url(&self, tx_hash: &str) -> Option<String> {
        explorer_link(self.explorer_tx_url.as_deref(), tx_hash)
    }

    async fn submit(&self, call: &OperationCall) -> Result<PendingOperation, WorkflowError> {
        let (_, calldata) = self.calldata(call)?;
        let value = parse_u256(&call.value).map_err(WorkflowError::Transport)?;

        log::info!(
            "[evm] Submitting {} to {}: value={}, data_len={} bytes",
            call, self.address, value, calldata.len()
        );

        let tx = Eip1559TransactionRequest::new()
            .to(self.contract)
            .value(value)
            .data(calldata);

        let pending = self.client.send_transaction(tx, None).await
            .map_err(|e| WorkflowError::transport(format!("Failed to submit {}: {}", call, e)))?;

        let tx_hash = format!("{:?}", pending.tx_hash());
        log::info!("[evm] Transaction sent: {}", tx_hash);

        Ok(PendingOperation::new(tx_hash))
    }

    async fn await_finalization(
        &self,
        pending: PendingOperation,
    ) -> Result<FinalizedOutcome, WorkflowError> {
        let tx_hash: H256 = pending.tx_hash().parse()
            .map_err(|_| WorkflowError::transport(format!("Invalid transaction hash: {}", pending.tx_hash())))?;
        let started = Instant::now();

        loop {
            let receipt = self.client.get_transaction_receipt(tx_hash).await
                .map_err(|e| {
                    WorkflowError::transport(format!("Failed to fetch receipt for {}: {}", pending.tx_hash(), e))
                })?;

            if let Some(receipt) = receipt {
                let success = receipt.status == Some(U64::from(1));
                log::info!(
                    "[evm] Receipt for {}: status={} block={:?}",
                    pending.tx_hash(),
                    if success { "success" } else { "failure" },
                    receipt.block_number
                );
                return Ok(FinalizedOutcome {
                    tx_hash: pending.tx_hash().to_string(),
                    success,
                    block_number: receipt.block_number.map(|b| b.as_u64()),
                    gas_used: receipt.gas_used.map(|g| g.to_string()),
                });
            }

            if let Some(timeout) = self.receipt_timeout {
                if started.elapsed() >= timeout {
                    return Err(WorkflowError::transport(format!(
                        "Timed out after {}s waiting for receipt of {}",
                        timeout.as_secs(),
                        pending.tx_hash()
                    )));
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn query(&self, call: &OperationCall) -> Result<ResultValue, WorkflowError> {
        let (function, calldata) = self.calldata(call)?;

        let tx: TypedTransaction = Eip1559TransactionRequest::new()
            .to(self.contract)
            .data(calldata)
            .into();

        let output = self.client.call(&tx, None).await
            .map_err(|e| WorkflowError::transport(format!("Failed to call {}: {}", call, e)))?;

        let value = decode_return(function, output.as_ref()).map_err(WorkflowError::Transport)?;
        Ok(ResultValue::new(value))
    }
}

/// Explorer link for a transaction, when an explorer is configured
pub fn explorer_link(base: Option<&str>, tx_hash: &str) -> Option<String> {
    base.map(|b| format!("{}/{}", b.trim_end_matches('/'), tx_hash))
}
