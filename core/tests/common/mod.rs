#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    path::{Path, PathBuf},
};

use brevis_quickstart_core::{
    circuit::CircuitDescriptor,
    error::{RpcError, SdkError},
    evidence::Evidence,
    gateway::{
        Gateway, PrepareQueryRequest, PrepareQueryResponse, QueryKey, QueryStatus,
        QueryStatusRequest, QueryStatusResponse, SubmitProofRequest,
    },
    prover::{CompiledArtifacts, ProvingBackend, Witness},
    rpc::ChainClient,
};
use ethers::{
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Address, Bytes, Eip1559TransactionRequest, Log,
        Transaction, TransactionReceipt, TransactionRequest, H256, U256, U64,
    },
};

pub const CHAIN_ID: u64 = 97;
pub const DEV_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn wallet() -> LocalWallet {
    DEV_PRIVATE_KEY
        .parse::<LocalWallet>()
        .unwrap()
        .with_chain_id(CHAIN_ID)
}

pub fn recipient() -> Address {
    Address::repeat_byte(0x5e)
}

fn signed(typed: TypedTransaction, mut tx: Transaction) -> Transaction {
    let wallet = wallet();
    let signature = wallet.sign_transaction_sync(&typed).unwrap();
    tx.hash = typed.hash(&signature);
    tx.from = wallet.address();
    tx.v = U64::from(signature.v);
    tx.r = signature.r;
    tx.s = signature.s;
    tx
}

/// A signed fee market transaction as a node would return it.
pub fn fee_market_tx() -> Transaction {
    let request = Eip1559TransactionRequest::new()
        .to(recipient())
        .value(1_000u64)
        .nonce(5u64)
        .gas(21_000u64)
        .max_priority_fee_per_gas(2_000_000_000u64)
        .max_fee_per_gas(40_000_000_000u64)
        .chain_id(CHAIN_ID);

    signed(
        request.into(),
        Transaction {
            nonce: U256::from(5),
            to: Some(recipient()),
            value: U256::from(1_000),
            gas: U256::from(21_000),
            max_priority_fee_per_gas: Some(U256::from(2_000_000_000u64)),
            max_fee_per_gas: Some(U256::from(40_000_000_000u64)),
            transaction_type: Some(U64::from(2)),
            chain_id: Some(U256::from(CHAIN_ID)),
            access_list: Some(Default::default()),
            ..Default::default()
        },
    )
}

/// A signed EIP-155 legacy transaction as a node would return it.
pub fn legacy_tx() -> Transaction {
    let request = TransactionRequest::new()
        .to(recipient())
        .value(7u64)
        .nonce(9u64)
        .gas(50_000u64)
        .gas_price(10_000_000_000u64)
        .chain_id(CHAIN_ID);

    signed(
        request.into(),
        Transaction {
            nonce: U256::from(9),
            to: Some(recipient()),
            value: U256::from(7),
            gas: U256::from(50_000),
            gas_price: Some(U256::from(10_000_000_000u64)),
            transaction_type: Some(U64::from(0)),
            chain_id: Some(U256::from(CHAIN_ID)),
            ..Default::default()
        },
    )
}

pub fn word(value: u64) -> Vec<u8> {
    let mut bytes = [0u8; 32];
    U256::from(value).to_big_endian(&mut bytes);
    bytes.to_vec()
}

pub fn log(address: Address, topics: Vec<H256>, data: Vec<u8>) -> Log {
    Log {
        address,
        topics,
        data: Bytes::from(data),
        ..Default::default()
    }
}

pub fn receipt(block_number: u64, logs: Vec<Log>) -> TransactionReceipt {
    TransactionReceipt {
        block_number: Some(U64::from(block_number)),
        logs,
        ..Default::default()
    }
}

#[derive(Default)]
pub struct FakeChain {
    transactions: HashMap<H256, Transaction>,
    receipts: HashMap<H256, TransactionReceipt>,
    pub calls: Cell<usize>,
}

impl FakeChain {
    pub fn with_transaction(mut self, tx: Transaction, receipt: TransactionReceipt) -> Self {
        self.receipts.insert(tx.hash, receipt);
        self.transactions.insert(tx.hash, tx);
        self
    }

    pub fn with_receipt(mut self, hash: H256, receipt: TransactionReceipt) -> Self {
        self.receipts.insert(hash, receipt);
        self
    }

    pub fn without_receipt(mut self, hash: H256) -> Self {
        self.receipts.remove(&hash);
        self
    }
}

impl ChainClient for FakeChain {
    async fn transaction_by_hash(&self, hash: H256) -> Result<Transaction, RpcError> {
        self.calls.set(self.calls.get() + 1);
        self.transactions
            .get(&hash)
            .cloned()
            .ok_or(RpcError::MissingTransaction(hash))
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<TransactionReceipt, RpcError> {
        self.calls.set(self.calls.get() + 1);
        self.receipts
            .get(&hash)
            .cloned()
            .ok_or(RpcError::MissingReceipt(hash))
    }
}

/// Deterministic stand-in for the proving SDK.
#[derive(Default)]
pub struct FakeBackend {
    pub compiles: Cell<usize>,
    pub srs_dirs: RefCell<Vec<PathBuf>>,
    pub evidence: RefCell<Vec<Evidence>>,
    pub reject_proofs: bool,
}

impl ProvingBackend for FakeBackend {
    async fn compile(
        &self,
        circuit: &CircuitDescriptor,
        srs_dir: &Path,
    ) -> Result<CompiledArtifacts, SdkError> {
        self.compiles.set(self.compiles.get() + 1);
        self.srs_dirs.borrow_mut().push(srs_dir.to_path_buf());
        let seed = circuit.name.as_bytes();
        Ok(CompiledArtifacts {
            compiled_circuit: Bytes::from([seed, &b"/ccs"[..]].concat()),
            proving_key: Bytes::from([seed, &b"/pk"[..]].concat()),
            verifying_key: Bytes::from([seed, &b"/vk"[..]].concat()),
        })
    }

    async fn build_circuit_input(
        &self,
        _circuit: &CircuitDescriptor,
        evidence: &[Evidence],
    ) -> Result<Bytes, SdkError> {
        self.evidence.borrow_mut().extend_from_slice(evidence);
        Ok(Bytes::from(serde_json::to_vec(evidence).unwrap()))
    }

    async fn build_witness(
        &self,
        _circuit: &CircuitDescriptor,
        circuit_input: &Bytes,
    ) -> Result<Witness, SdkError> {
        Ok(Witness {
            full: circuit_input.clone(),
            public: Bytes::from(circuit_input[..8].to_vec()),
        })
    }

    async fn prove(
        &self,
        _compiled_circuit: &Bytes,
        proving_key: &Bytes,
        witness: &Bytes,
    ) -> Result<Bytes, SdkError> {
        Ok(Bytes::from([&proving_key[..], &witness[..4]].concat()))
    }

    async fn verify(
        &self,
        _verifying_key: &Bytes,
        _public_witness: &Bytes,
        _proof: &Bytes,
    ) -> Result<bool, SdkError> {
        Ok(!self.reject_proofs)
    }
}

pub const SETTLEMENT_TX: H256 = H256([0x77; 32]);

#[derive(Default)]
pub struct FakeGateway {
    pub prepared: RefCell<Vec<PrepareQueryRequest>>,
    pub submitted: RefCell<Vec<SubmitProofRequest>>,
    pub polls: Cell<usize>,
}

impl Gateway for FakeGateway {
    async fn prepare_query(
        &self,
        request: &PrepareQueryRequest,
    ) -> Result<PrepareQueryResponse, SdkError> {
        self.prepared.borrow_mut().push(request.clone());
        Ok(PrepareQueryResponse {
            query_key: QueryKey {
                query_hash: H256::repeat_byte(0x42),
                nonce: 1,
            },
            fee: 1_500_000_000_000_000,
        })
    }

    async fn submit_proof(&self, request: &SubmitProofRequest) -> Result<(), SdkError> {
        self.submitted.borrow_mut().push(request.clone());
        Ok(())
    }

    async fn query_status(
        &self,
        _request: &QueryStatusRequest,
    ) -> Result<QueryStatusResponse, SdkError> {
        let polls = self.polls.get() + 1;
        self.polls.set(polls);
        Ok(if polls < 2 {
            QueryStatusResponse {
                status: QueryStatus::ToBeSentOnchain,
                tx_hash: None,
                message: None,
            }
        } else {
            QueryStatusResponse {
                status: QueryStatus::CompleteOnchain,
                tx_hash: Some(SETTLEMENT_TX),
                message: None,
            }
        })
    }
}
