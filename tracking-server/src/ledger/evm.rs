//! EVM ledger over the order-tracker contract
//!
//! Transactions are signed by one configured account. Sends go through
//! `send_lock` so the account never has two transactions racing for the
//! same nonce; anchor throughput is therefore one transaction at a time.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, FixedBytes, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
use shared::models::LedgerStatus;
use std::str::FromStr;
use tokio::sync::Mutex;

use super::{Digest, Ledger, LedgerError, LedgerResult};
use crate::core::config::LedgerConfig;

sol! {
    #[sol(rpc)]
    interface IOrderTracker {
        event OrderUpdateHashStored(uint256 indexed orderId, bytes32 updateHash);

        function storeUpdateHash(uint256 orderId, bytes32 updateHash) external;

        function getUpdateHash(uint256 orderId) external view returns (bytes32[] memory);
    }
}

pub struct EvmLedger {
    config: LedgerConfig,
    signer: PrivateKeySigner,
    contract_address: Address,
    send_lock: Mutex<()>,
}

impl EvmLedger {
    /// Validate key and contract address; no network access happens here
    pub fn new(config: LedgerConfig) -> LedgerResult<Self> {
        let signer = config
            .private_key
            .parse::<PrivateKeySigner>()
            .map_err(|e| LedgerError::Config(format!("Invalid private key: {}", e)))?;

        let contract_address = Address::from_str(&config.contract_address).map_err(|e| {
            LedgerError::Config(format!(
                "Invalid contract address '{}': {}",
                config.contract_address, e
            ))
        })?;

        tracing::info!(
            network = %config.network,
            chain_id = config.chain_id,
            contract = %contract_address,
            wallet = %signer.address(),
            "EVM ledger configured"
        );

        Ok(Self {
            config,
            signer,
            contract_address,
            send_lock: Mutex::new(()),
        })
    }

    pub fn wallet_address(&self) -> Address {
        self.signer.address()
    }

    fn provider(&self) -> LedgerResult<impl Provider> {
        let rpc_url = self
            .config
            .rpc_url
            .parse()
            .map_err(|e| LedgerError::Config(format!("Invalid RPC URL: {}", e)))?;

        let wallet = EthereumWallet::from(self.signer.clone());
        Ok(ProviderBuilder::new().wallet(wallet).connect_http(rpc_url))
    }

    async fn snapshot(&self) -> LedgerResult<(String, u64)> {
        let provider = self.provider()?;
        let balance = provider
            .get_balance(self.wallet_address())
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        let block = provider
            .get_block_number()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        Ok((balance.to_string(), block))
    }
}

fn order_key(order_id: i64) -> LedgerResult<U256> {
    u64::try_from(order_id)
        .map(U256::from)
        .map_err(|_| LedgerError::InvalidOrderId(order_id))
}

#[async_trait]
impl Ledger for EvmLedger {
    async fn store_digest(&self, order_id: i64, digest: Digest) -> LedgerResult<String> {
        let key = order_key(order_id)?;
        let _guard = self.send_lock.lock().await;

        let provider = self.provider()?;
        let contract = IOrderTracker::new(self.contract_address, &provider);

        let pending_tx = contract
            .storeUpdateHash(key, FixedBytes::from(*digest.as_bytes()))
            .send()
            .await
            .map_err(|e| LedgerError::from_send_error(e.to_string()))?;

        let tx_hash = *pending_tx.tx_hash();
        tracing::debug!(order_id, tx_hash = %tx_hash, "Anchor transaction submitted");

        let receipt = pending_tx
            .get_receipt()
            .await
            .map_err(|e| LedgerError::Transaction(e.to_string()))?;

        if !receipt.status() {
            return Err(LedgerError::Transaction(format!(
                "Transaction reverted: 0x{:x}",
                tx_hash
            )));
        }

        Ok(format!("0x{:x}", receipt.transaction_hash))
    }

    async fn get_digests(&self, order_id: i64) -> LedgerResult<Vec<Digest>> {
        let key = order_key(order_id)?;
        let provider = self.provider()?;
        let contract = IOrderTracker::new(self.contract_address, &provider);

        let hashes = contract
            .getUpdateHash(key)
            .call()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;

        Ok(hashes.into_iter().map(|h| Digest(h.0)).collect())
    }

    fn contract_address(&self) -> Option<String> {
        Some(format!("{}", self.contract_address))
    }

    async fn status(&self) -> LedgerStatus {
        let mut status = LedgerStatus {
            connected: false,
            network: self.config.network.clone(),
            wallet_address: Some(format!("{}", self.wallet_address())),
            contract_address: self.contract_address(),
            ..Default::default()
        };
        match self.snapshot().await {
            Ok((balance, block)) => {
                status.connected = true;
                status.wallet_balance = Some(balance);
                status.block_number = Some(block);
            }
            Err(e) => status.error = Some(e.to_string()),
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key (anvil account #0)
    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn config(key: &str, contract: &str) -> LedgerConfig {
        LedgerConfig {
            rpc_url: "http://127.0.0.1:8545".into(),
            private_key: key.into(),
            contract_address: contract.into(),
            chain_id: 31337,
            network: "anvil".into(),
        }
    }

    #[test]
    fn builds_from_valid_config() {
        let ledger = EvmLedger::new(config(
            DEV_KEY,
            "0x5FbDB2315678afecb367f032d93F642f64180aa3",
        ))
        .unwrap();
        assert_eq!(
            format!("{}", ledger.wallet_address()),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert!(ledger.contract_address().is_some());
    }

    #[test]
    fn rejects_bad_key_and_address() {
        assert!(matches!(
            EvmLedger::new(config("nothex", "0x5FbDB2315678afecb367f032d93F642f64180aa3")),
            Err(LedgerError::Config(_))
        ));
        assert!(matches!(
            EvmLedger::new(config(DEV_KEY, "not-an-address")),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn negative_order_ids_are_rejected() {
        assert!(matches!(order_key(-1), Err(LedgerError::InvalidOrderId(-1))));
        assert_eq!(order_key(7).unwrap(), U256::from(7u64));
    }
}
