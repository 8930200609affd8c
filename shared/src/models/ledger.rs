//! Ledger connection status (`GET /ledger/status`)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LedgerStatus {
    pub connected: bool,
    pub network: String,
    pub wallet_address: Option<String>,
    /// Balance in wei, decimal string
    pub wallet_balance: Option<String>,
    pub block_number: Option<u64>,
    pub contract_address: Option<String>,
    pub error: Option<String>,
}
