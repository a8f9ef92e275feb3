use std::path::PathBuf;

use ethers::types::{Bytes, H256};
use log::{debug, info};

use crate::{
    artifacts::ArtifactStore,
    circuit::{AppCircuit, CircuitDescriptor},
    config::{CompileConfig, ProveConfig},
    error::{EvidenceError, Result, SdkError},
    eth::FeePayer,
    evidence::{self, Evidence, ReceiptData, TransactionData},
    gateway::{self, Gateway, PollPolicy, SubmitProofRequest},
    prover::{CompiledArtifacts, ProvingBackend, Witness},
    request::{PreparedRequest, RequestParams},
    rpc::ChainClient,
};

/// Collects evidence for one circuit and carries a single request through the gateway.
pub struct BrevisApp<'a, P, G> {
    backend: &'a P,
    gateway: &'a G,
    circuit: CircuitDescriptor,
    evidence: Vec<Evidence>,
    prepared: Option<PreparedRequest>,
}

impl<'a, P: ProvingBackend, G: Gateway> BrevisApp<'a, P, G> {
    pub fn new(backend: &'a P, gateway: &'a G, circuit: &AppCircuit) -> Self {
        Self {
            backend,
            gateway,
            circuit: circuit.descriptor(),
            evidence: vec![],
            prepared: None,
        }
    }

    pub fn add_transaction(&mut self, tx: TransactionData) {
        self.evidence.push(Evidence::Transaction(tx));
    }

    pub fn add_receipt(&mut self, receipt: ReceiptData) {
        self.evidence.push(Evidence::Receipt(receipt));
    }

    pub fn add_evidence(&mut self, evidence: Evidence) {
        self.evidence.push(evidence);
    }

    fn check_allocation(&self) -> Result<(), EvidenceError> {
        let allocation = self.circuit.allocation;
        let transactions = self
            .evidence
            .iter()
            .filter(|evidence| matches!(evidence, Evidence::Transaction(_)))
            .count();
        let receipts = self.evidence.len() - transactions;

        if transactions > allocation.max_transactions {
            return Err(EvidenceError::AllocationExceeded {
                kind: "transactions",
                max: allocation.max_transactions,
                got: transactions,
            });
        }
        if receipts > allocation.max_receipts {
            return Err(EvidenceError::AllocationExceeded {
                kind: "receipts",
                max: allocation.max_receipts,
                got: receipts,
            });
        }
        Ok(())
    }

    pub async fn build_circuit_input(&self) -> Result<Bytes> {
        self.check_allocation()?;
        Ok(self
            .backend
            .build_circuit_input(&self.circuit, &self.evidence)
            .await?)
    }

    pub async fn build_witness(&self, circuit_input: &Bytes) -> Result<Witness> {
        Ok(self.backend.build_witness(&self.circuit, circuit_input).await?)
    }

    /// Registers the request with the gateway and builds the fee payment calldata.
    pub async fn prepare_request(
        &mut self,
        verifying_key: &Bytes,
        witness: &Witness,
        params: &RequestParams,
    ) -> Result<PreparedRequest> {
        let query = params.prepare_query(verifying_key, &witness.public);
        let response = self.gateway.prepare_query(&query).await?;
        let prepared = params.prepared(&response);
        self.prepared = Some(prepared.clone());
        Ok(prepared)
    }

    fn prepared(&self, operation: &'static str) -> Result<&PreparedRequest, SdkError> {
        self.prepared
            .as_ref()
            .ok_or(SdkError::RequestNotPrepared(operation))
    }

    pub async fn submit_proof(&self, proof: &Bytes) -> Result<()> {
        let prepared = self.prepared("submitting a proof")?;
        let request = SubmitProofRequest {
            query_key: prepared.query_key,
            target_chain_id: prepared.dst_chain_id,
            proof: proof.clone(),
        };
        Ok(self.gateway.submit_proof(&request).await?)
    }

    pub async fn wait_final_proof_submitted(&self, policy: &PollPolicy) -> Result<H256> {
        let prepared = self.prepared("waiting for the final proof")?;
        Ok(gateway::wait_final_proof_submitted(
            self.gateway,
            prepared.query_key,
            prepared.dst_chain_id,
            policy,
        )
        .await?)
    }
}

/// Compiles `config.circuit` into `config.out_dir`, reusing what is already
/// there when it was compiled from the same circuit and is intact.
pub async fn compile<P: ProvingBackend>(
    backend: &P,
    config: &CompileConfig,
) -> Result<CompiledArtifacts> {
    let store = ArtifactStore::new(&config.out_dir);
    let circuit = config.circuit.descriptor();

    if let Some(artifacts) = store.current_setup(&circuit)? {
        info!(
            "Circuit {} is already compiled in {}",
            circuit.name,
            config.out_dir.display()
        );
        return Ok(artifacts);
    }

    info!(
        "Compiling circuit {}, caching SRS in {}",
        circuit.name,
        config.srs_dir.display()
    );
    let artifacts = backend.compile(&circuit, &config.srs_dir).await?;
    store.persist(&circuit, &artifacts)?;
    Ok(artifacts)
}

/// Fetches the evidence `circuit` proves things about.
pub async fn acquire_evidence<C: ChainClient>(
    chain: &C,
    circuit: &AppCircuit,
    tx_hash: H256,
) -> Result<Evidence> {
    match circuit {
        AppCircuit::Age => evidence::select_transaction(chain, tx_hash)
            .await
            .map(Evidence::Transaction),
        AppCircuit::TokenTransfer(filter) => evidence::select_transfer_log(chain, tx_hash, filter)
            .await
            .map(Evidence::Receipt),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProveOutcome {
    pub proof_path: PathBuf,
    pub request: PreparedRequest,
    pub fee_tx: Option<H256>,
    pub settlement_tx: H256,
}

/// Runs a whole proving round: evidence, witness, proof, local verification,
/// request preparation, fee payment, submission and settlement.
pub async fn prove<C, P, G, F>(
    config: &ProveConfig,
    chain: &C,
    backend: &P,
    gateway: &G,
    payer: &F,
) -> Result<ProveOutcome>
where
    C: ChainClient,
    P: ProvingBackend,
    G: Gateway,
    F: FeePayer,
{
    let store = ArtifactStore::new(&config.out_dir);
    let CompiledArtifacts {
        compiled_circuit,
        proving_key,
        verifying_key,
    } = store.read_setup()?;
    debug!("Loaded setup from {}", config.out_dir.display());

    let mut app = BrevisApp::new(backend, gateway, &config.circuit);
    app.add_evidence(acquire_evidence(chain, &config.circuit, config.tx_hash).await?);

    info!("Proving transaction {:?} using my circuit", config.tx_hash);
    let circuit_input = app.build_circuit_input().await?;
    let witness = app.build_witness(&circuit_input).await?;
    let proof = backend
        .prove(&compiled_circuit, &proving_key, &witness.full)
        .await?;
    let proof_path = store.write_proof(config.tx_hash, &proof)?;
    info!("Proof written to {}", proof_path.display());

    if !backend
        .verify(&verifying_key, &witness.public, &proof)
        .await?
    {
        return Err(SdkError::VerificationFailed.into());
    }

    info!("Initiating Brevis request");
    let request = app
        .prepare_request(&verifying_key, &witness, &config.request)
        .await?;
    info!("calldata {}", hex::encode(&request.calldata));
    info!("feeValue {}", request.fee_value);
    info!("requestId {:?}", request.request_id());

    let fee_tx = payer.pay(&request).await?;

    info!("Submitting my proof to Brevis");
    app.submit_proof(&proof).await?;

    info!("Waiting for final proof generation and submission");
    let settlement_tx = app.wait_final_proof_submitted(&config.poll).await?;
    info!("Final proof submitted: tx hash {settlement_tx:?}");

    Ok(ProveOutcome {
        proof_path,
        request,
        fee_tx,
        settlement_tx,
    })
}
