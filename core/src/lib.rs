//! Library behind the Brevis quickstart: fetches on-chain evidence, drives an
//! external proving SDK and carries the resulting proof through the Brevis
//! gateway until it is settled on-chain.

/// On-disk storage of compiled circuits and proofs.
pub mod artifacts;
/// Application circuits and their descriptors.
pub mod circuit;
/// Run configuration for the compile and prove modes.
pub mod config;
pub mod error;
/// Request calldata and fee payment.
pub mod eth;
pub mod evidence;
pub mod gateway;
pub mod prover;
pub mod request;
/// Ethereum JSON-RPC access.
pub mod rpc;
/// Compile and prove pipelines.
pub mod sdk;
pub mod utils;
