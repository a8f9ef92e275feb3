use std::{path::PathBuf, time::Duration};

use ethers::types::H256;

/// Failures talking to the Ethereum JSON-RPC node.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("invalid RPC URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("RPC request failed: {0}")]
    Provider(#[from] ethers::providers::ProviderError),
    #[error("transaction {0:?} not found")]
    MissingTransaction(H256),
    #[error("receipt for transaction {0:?} not found")]
    MissingReceipt(H256),
    #[error("RPC response is missing field `{0}`")]
    MissingField(&'static str),
}

/// Failures selecting on-chain evidence for the circuit.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error("no qualifying evidence found in transaction {0:?}")]
    NotFound(H256),
    #[error("failed to recover sender of {tx_hash:?}: {reason}")]
    SenderRecovery { tx_hash: H256, reason: String },
    #[error("transaction {0:?} has no recipient (contract creation)")]
    MissingRecipient(H256),
    #[error("field `{field}` of transaction {tx_hash:?} does not fit in 64 bits")]
    Overflow { tx_hash: H256, field: &'static str },
    #[error("log position {log_pos} out of range, receipt has {len} logs")]
    LogOutOfRange { log_pos: usize, len: usize },
    #[error("topic {index} out of range in log {log_pos}, log has {len} topics")]
    TopicOutOfRange {
        log_pos: usize,
        index: usize,
        len: usize,
    },
    #[error("data word {index} out of range in log {log_pos}, log data is {len} bytes")]
    DataOutOfRange {
        log_pos: usize,
        index: usize,
        len: usize,
    },
    #[error("circuit allows at most {max} {kind} but {got} were added")]
    AllocationExceeded {
        kind: &'static str,
        max: usize,
        got: usize,
    },
}

/// Failures reported by, or while talking to, the proving SDK collaborators.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("{service} request to {endpoint} failed: {source}")]
    Http {
        service: &'static str,
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} rejected {endpoint}: {message}")]
    Service {
        service: &'static str,
        endpoint: String,
        message: String,
    },
    #[error("artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt artifact manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },
    #[error("proof verification failed")]
    VerificationFailed,
    #[error("request must be prepared before {0}")]
    RequestNotPrepared(&'static str),
    #[error("query {request_id:?} failed on the gateway: {message}")]
    QueryFailed { request_id: H256, message: String },
    #[error("final proof was not submitted within {0:?}")]
    Timeout(Duration),
}

/// Failures paying the request fee on-chain.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("wallet error: {0}")]
    Wallet(String),
    #[error("gas check failed: {0}")]
    Gas(String),
    #[error("fee transaction failed: {0}")]
    Transaction(String),
}

#[derive(Debug, thiserror::Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub String);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Evidence(#[from] EvidenceError),
    #[error(transparent)]
    Sdk(#[from] SdkError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
