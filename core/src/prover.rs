//! Seam to the external proving SDK.
//!
//! Circuit compilation, witness generation, proving and verification all
//! happen outside this crate. [`RemoteProver`] reaches an SDK prover service
//! over HTTP; every artifact crosses the wire as an opaque 0x-hex blob.

use std::path::{Path, PathBuf};

use ethers::types::Bytes;
use log::debug;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{circuit::CircuitDescriptor, error::SdkError, evidence::Evidence};

/// Output of a circuit compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledArtifacts {
    pub compiled_circuit: Bytes,
    pub proving_key: Bytes,
    pub verifying_key: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Witness {
    pub full: Bytes,
    pub public: Bytes,
}

#[allow(async_fn_in_trait)]
pub trait ProvingBackend {
    async fn compile(
        &self,
        circuit: &CircuitDescriptor,
        srs_dir: &Path,
    ) -> Result<CompiledArtifacts, SdkError>;

    async fn build_circuit_input(
        &self,
        circuit: &CircuitDescriptor,
        evidence: &[Evidence],
    ) -> Result<Bytes, SdkError>;

    async fn build_witness(
        &self,
        circuit: &CircuitDescriptor,
        circuit_input: &Bytes,
    ) -> Result<Witness, SdkError>;

    async fn prove(
        &self,
        compiled_circuit: &Bytes,
        proving_key: &Bytes,
        witness: &Bytes,
    ) -> Result<Bytes, SdkError>;

    async fn verify(
        &self,
        verifying_key: &Bytes,
        public_witness: &Bytes,
        proof: &Bytes,
    ) -> Result<bool, SdkError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompileRequest<'a> {
    circuit: &'a CircuitDescriptor,
    srs_dir: PathBuf,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CircuitInputRequest<'a> {
    circuit: &'a CircuitDescriptor,
    evidence: &'a [Evidence],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CircuitInputResponse {
    circuit_input: Bytes,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WitnessRequest<'a> {
    circuit: &'a CircuitDescriptor,
    circuit_input: &'a Bytes,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProveRequest<'a> {
    compiled_circuit: &'a Bytes,
    proving_key: &'a Bytes,
    witness: &'a Bytes,
}

#[derive(Deserialize)]
struct ProveResponse {
    proof: Bytes,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    verifying_key: &'a Bytes,
    public_witness: &'a Bytes,
    proof: &'a Bytes,
}

#[derive(Deserialize)]
struct VerifyResponse {
    valid: bool,
}

/// Error body returned by the prover service alongside a non-success status.
#[derive(Deserialize)]
struct ServiceError {
    error: String,
}

/// HTTP client for an out-of-process SDK prover service.
pub struct RemoteProver {
    url: String,
    client: reqwest::Client,
}

impl RemoteProver {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Req,
    ) -> Result<Resp, SdkError> {
        let http_err = |source| SdkError::Http {
            service: "prover",
            endpoint: endpoint.to_owned(),
            source,
        };

        debug!("Calling prover service {endpoint}");
        let response = self
            .client
            .post(format!("{}/{endpoint}", self.url))
            .json(body)
            .send()
            .await
            .map_err(http_err)?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<ServiceError>().await {
                Ok(body) => body.error,
                Err(_) => status.to_string(),
            };
            return Err(SdkError::Service {
                service: "prover",
                endpoint: endpoint.to_owned(),
                message,
            });
        }

        response.json().await.map_err(http_err)
    }
}

impl ProvingBackend for RemoteProver {
    async fn compile(
        &self,
        circuit: &CircuitDescriptor,
        srs_dir: &Path,
    ) -> Result<CompiledArtifacts, SdkError> {
        let request = CompileRequest {
            circuit,
            srs_dir: srs_dir.to_path_buf(),
        };
        self.post("compile", &request).await
    }

    async fn build_circuit_input(
        &self,
        circuit: &CircuitDescriptor,
        evidence: &[Evidence],
    ) -> Result<Bytes, SdkError> {
        let request = CircuitInputRequest { circuit, evidence };
        self.post::<_, CircuitInputResponse>("circuit-input", &request)
            .await
            .map(|response| response.circuit_input)
    }

    async fn build_witness(
        &self,
        circuit: &CircuitDescriptor,
        circuit_input: &Bytes,
    ) -> Result<Witness, SdkError> {
        let request = WitnessRequest {
            circuit,
            circuit_input,
        };
        self.post("witness", &request).await
    }

    async fn prove(
        &self,
        compiled_circuit: &Bytes,
        proving_key: &Bytes,
        witness: &Bytes,
    ) -> Result<Bytes, SdkError> {
        let request = ProveRequest {
            compiled_circuit,
            proving_key,
            witness,
        };
        self.post::<_, ProveResponse>("prove", &request)
            .await
            .map(|response| response.proof)
    }

    async fn verify(
        &self,
        verifying_key: &Bytes,
        public_witness: &Bytes,
        proof: &Bytes,
    ) -> Result<bool, SdkError> {
        let request = VerifyRequest {
            verifying_key,
            public_witness,
            proof,
        };
        self.post::<_, VerifyResponse>("verify", &request)
            .await
            .map(|response| response.valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let prover = RemoteProver::new("http://localhost:33247/");
        assert_eq!(prover.url, "http://localhost:33247");
    }

    #[test]
    fn artifacts_travel_as_hex() {
        let artifacts = CompiledArtifacts {
            compiled_circuit: Bytes::from(vec![0xde, 0xad]),
            proving_key: Bytes::from(vec![0x01]),
            verifying_key: Bytes::from(vec![]),
        };
        let json = serde_json::to_value(&artifacts).unwrap();
        assert_eq!(json["compiledCircuit"], "0xdead");
        assert_eq!(json["verifyingKey"], "0x");
    }
}
