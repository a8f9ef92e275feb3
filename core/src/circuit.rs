use ethers::types::H256;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::evidence::TransferFilter;

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_EVENT_ID: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// Upper bounds on how much evidence of each kind a circuit accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub max_receipts: usize,
    pub max_storage: usize,
    pub max_transactions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvidenceKind {
    Transaction,
    Receipt,
}

/// What the external compiler is asked to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitDescriptor {
    pub name: String,
    pub version: u32,
    pub allocation: Allocation,
    pub evidence: EvidenceKind,
}

impl CircuitDescriptor {
    /// Stable identity of the descriptor, used to tell whether stored artifacts
    /// were compiled from it.
    pub fn digest(&self) -> H256 {
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        H256::from_slice(&Keccak256::digest(encoded))
    }
}

/// The application circuits this quickstart knows how to drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCircuit {
    /// Proves a transaction was sent, and so the sender's account existed, at a given block.
    Age,
    /// Proves a token transfer of at least some amount reached a recipient.
    TokenTransfer(TransferFilter),
}

impl AppCircuit {
    pub fn allocation(&self) -> Allocation {
        match self {
            AppCircuit::Age => Allocation {
                max_receipts: 0,
                max_storage: 0,
                max_transactions: 1,
            },
            AppCircuit::TokenTransfer(_) => Allocation {
                max_receipts: 1,
                max_storage: 0,
                max_transactions: 0,
            },
        }
    }

    pub fn descriptor(&self) -> CircuitDescriptor {
        let (name, evidence) = match self {
            AppCircuit::Age => ("account-age", EvidenceKind::Transaction),
            AppCircuit::TokenTransfer(_) => ("token-transfer", EvidenceKind::Receipt),
        };
        CircuitDescriptor {
            name: name.to_owned(),
            version: 1,
            allocation: self.allocation(),
            evidence,
        }
    }
}
