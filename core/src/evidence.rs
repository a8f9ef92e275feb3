//! Selection of the on-chain facts that become circuit inputs.
//!
//! Two shapes of evidence are supported: a whole transaction, used by the
//! account age circuit, and individual fields of a receipt's logs, used by the
//! token transfer circuit.

use ethers::types::{Address, Log, Transaction, TransactionReceipt, H256, U256};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    error::{EvidenceError, Result, RpcError},
    rpc::ChainClient,
};

/// Size in bytes of a topic or of a data word.
pub const WORD_LEN: usize = 32;

const LEGACY_TX_TYPE: u64 = 0;
const ACCESS_LIST_TX_TYPE: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    pub hash: H256,
    pub chain_id: U256,
    pub block_num: u64,
    pub nonce: u64,
    /// Gas price for legacy and access list transactions, tip cap otherwise.
    pub gas_tip_cap_or_gas_price: U256,
    /// Zero for legacy transactions.
    pub gas_fee_cap: U256,
    pub gas_limit: u64,
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// Points at one topic or one data word of one log in a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFieldSelector {
    pub log_pos: usize,
    pub is_topic: bool,
    pub field_index: usize,
}

/// A selector together with the values it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFieldData {
    #[serde(flatten)]
    pub selector: LogFieldSelector,
    pub contract: Address,
    pub event_id: H256,
    pub value: H256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptData {
    pub tx_hash: H256,
    pub block_num: u64,
    pub fields: Vec<LogFieldData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Evidence {
    Transaction(TransactionData),
    Receipt(ReceiptData),
}

/// Which log the token transfer circuit is interested in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFilter {
    pub token: Address,
    pub event_id: H256,
    pub min_amount: U256,
}

impl LogFieldSelector {
    pub fn topic(log_pos: usize, field_index: usize) -> Self {
        Self {
            log_pos,
            is_topic: true,
            field_index,
        }
    }

    pub fn data(log_pos: usize, field_index: usize) -> Self {
        Self {
            log_pos,
            is_topic: false,
            field_index,
        }
    }

    /// Reads the selected field out of `logs`, rejecting any out-of-range index.
    pub fn resolve(&self, logs: &[Log]) -> Result<LogFieldData, EvidenceError> {
        let log = logs.get(self.log_pos).ok_or(EvidenceError::LogOutOfRange {
            log_pos: self.log_pos,
            len: logs.len(),
        })?;
        let event_id = *log.topics.first().ok_or(EvidenceError::TopicOutOfRange {
            log_pos: self.log_pos,
            index: 0,
            len: 0,
        })?;

        let value = if self.is_topic {
            *log
                .topics
                .get(self.field_index)
                .ok_or(EvidenceError::TopicOutOfRange {
                    log_pos: self.log_pos,
                    index: self.field_index,
                    len: log.topics.len(),
                })?
        } else {
            data_word(log, self.field_index).ok_or(EvidenceError::DataOutOfRange {
                log_pos: self.log_pos,
                index: self.field_index,
                len: log.data.len(),
            })?
        };

        Ok(LogFieldData {
            selector: *self,
            contract: log.address,
            event_id,
            value,
        })
    }
}

impl ReceiptData {
    /// Resolves every selector against the receipt. Either all of them resolve or none.
    pub fn from_selectors(
        tx_hash: H256,
        receipt: &TransactionReceipt,
        selectors: &[LogFieldSelector],
    ) -> Result<Self> {
        let block_num = receipt
            .block_number
            .ok_or(RpcError::MissingField("blockNumber"))?
            .as_u64();
        let fields = selectors
            .iter()
            .map(|selector| selector.resolve(&receipt.logs))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            tx_hash,
            block_num,
            fields,
        })
    }
}

fn data_word(log: &Log, index: usize) -> Option<H256> {
    let start = index.checked_mul(WORD_LEN)?;
    let end = start.checked_add(WORD_LEN)?;
    log.data.get(start..end).map(H256::from_slice)
}

/// Returns `(tip or price, fee cap)` following the transaction's fee model.
pub fn fee_fields(tx: &Transaction) -> Result<(U256, U256), RpcError> {
    let tx_type = tx
        .transaction_type
        .map(|tx_type| tx_type.as_u64())
        .unwrap_or(LEGACY_TX_TYPE);

    match tx_type {
        LEGACY_TX_TYPE => {
            let gas_price = tx.gas_price.ok_or(RpcError::MissingField("gasPrice"))?;
            Ok((gas_price, U256::zero()))
        }
        ACCESS_LIST_TX_TYPE => {
            let gas_price = tx.gas_price.ok_or(RpcError::MissingField("gasPrice"))?;
            Ok((gas_price, gas_price))
        }
        _ => {
            let tip_cap = tx
                .max_priority_fee_per_gas
                .ok_or(RpcError::MissingField("maxPriorityFeePerGas"))?;
            let fee_cap = tx
                .max_fee_per_gas
                .ok_or(RpcError::MissingField("maxFeePerGas"))?;
            Ok((tip_cap, fee_cap))
        }
    }
}

/// Chain id carried by the transaction, or derived from an EIP-155 `v`.
/// Unprotected legacy transactions yield zero.
pub fn chain_id(tx: &Transaction) -> U256 {
    if let Some(chain_id) = tx.chain_id {
        return chain_id;
    }
    let v = tx.v.as_u64();
    if v >= 35 {
        U256::from((v - 35) / 2)
    } else {
        U256::zero()
    }
}

fn to_u64(value: U256, tx_hash: H256, field: &'static str) -> Result<u64, EvidenceError> {
    if value > U256::from(u64::MAX) {
        return Err(EvidenceError::Overflow { tx_hash, field });
    }
    Ok(value.as_u64())
}

/// Recovers the signer of `tx`. Some nodes omit `chainId` on EIP-155 legacy
/// transactions, so the id derived from `v` is put back before hashing.
fn recover_sender(tx_hash: H256, tx: &Transaction) -> Result<Address, EvidenceError> {
    let recover = |tx: &Transaction| {
        tx.recover_from()
            .map_err(|err| EvidenceError::SenderRecovery {
                tx_hash,
                reason: err.to_string(),
            })
    };

    let derived = chain_id(tx);
    if tx.chain_id.is_some() || derived.is_zero() {
        return recover(tx);
    }
    let mut protected = tx.clone();
    protected.chain_id = Some(derived);
    recover(&protected)
}

/// Packages a fetched transaction and its receipt as whole-transaction evidence.
pub fn transaction_data(
    tx_hash: H256,
    tx: &Transaction,
    receipt: &TransactionReceipt,
) -> Result<TransactionData> {
    let to = tx.to.ok_or(EvidenceError::MissingRecipient(tx_hash))?;
    let from = recover_sender(tx_hash, tx)?;
    let (gas_tip_cap_or_gas_price, gas_fee_cap) = fee_fields(tx)?;
    let block_num = receipt
        .block_number
        .ok_or(RpcError::MissingField("blockNumber"))?
        .as_u64();

    Ok(TransactionData {
        hash: tx_hash,
        chain_id: chain_id(tx),
        block_num,
        nonce: to_u64(tx.nonce, tx_hash, "nonce")?,
        gas_tip_cap_or_gas_price,
        gas_fee_cap,
        gas_limit: to_u64(tx.gas, tx_hash, "gas")?,
        from,
        to,
        value: tx.value,
    })
}

/// Fetches a transaction and its receipt and turns them into one evidence record.
pub async fn select_transaction<C: ChainClient>(
    client: &C,
    tx_hash: H256,
) -> Result<TransactionData> {
    let tx = client.transaction_by_hash(tx_hash).await?;
    let receipt = client.transaction_receipt(tx_hash).await?;
    let data = transaction_data(tx_hash, &tx, &receipt)?;
    info!(
        "Selected transaction {:?} from {:?} in block {}",
        data.hash, data.from, data.block_num
    );
    Ok(data)
}

/// Position of the first log emitted by the filter's token with the filter's
/// event id whose first data word is at least the filter's minimum amount.
/// Logs with less than one full data word never qualify.
pub fn find_transfer_log(logs: &[Log], filter: &TransferFilter) -> Option<usize> {
    logs.iter().position(|log| {
        log.address == filter.token
            && log.topics.first() == Some(&filter.event_id)
            && log.data.len() >= WORD_LEN
            && U256::from_big_endian(&log.data[..WORD_LEN]) >= filter.min_amount
    })
}

/// Fetches the receipt of `tx_hash` and selects the recipient topic and the
/// amount word of its first qualifying transfer log.
pub async fn select_transfer_log<C: ChainClient>(
    client: &C,
    tx_hash: H256,
    filter: &TransferFilter,
) -> Result<ReceiptData> {
    if tx_hash.is_zero() {
        return Err(EvidenceError::NotFound(tx_hash).into());
    }

    let receipt = client.transaction_receipt(tx_hash).await?;
    let log_pos =
        find_transfer_log(&receipt.logs, filter).ok_or(EvidenceError::NotFound(tx_hash))?;
    debug!("Log {log_pos} of {tx_hash:?} qualifies as transfer evidence");

    ReceiptData::from_selectors(
        tx_hash,
        &receipt,
        &[
            LogFieldSelector::topic(log_pos, 1),
            LogFieldSelector::data(log_pos, 0),
        ],
    )
}
