//! Client side of the Brevis gateway: request preparation, proof submission
//! and settlement polling.

use std::time::Duration;

use ethers::types::{Address, Bytes, H256};
use log::{debug, info};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::error::SdkError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(12);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOption {
    #[serde(rename = "ZK_MODE")]
    ZkMode,
    #[serde(rename = "OP_MODE")]
    OpMode,
}

impl QueryOption {
    /// Value of the `option` argument of `sendRequest`.
    pub fn as_u8(self) -> u8 {
        match self {
            QueryOption::ZkMode => 0,
            QueryOption::OpMode => 1,
        }
    }
}

/// Identifies one request on the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryKey {
    pub query_hash: H256,
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareQueryRequest {
    pub chain_id: u64,
    pub target_chain_id: u64,
    pub vk_hash: H256,
    pub public_witness: Bytes,
    pub callback_addr: Address,
    pub callback_gas: u64,
    pub option: QueryOption,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareQueryResponse {
    pub query_key: QueryKey,
    /// Fee in wei, sent by the gateway as a decimal string.
    #[serde_as(as = "DisplayFromStr")]
    pub fee: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProofRequest {
    pub query_key: QueryKey,
    pub target_chain_id: u64,
    pub proof: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStatusRequest {
    pub query_key: QueryKey,
    pub target_chain_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum QueryStatus {
    #[serde(rename = "QS_WAITING_FOR_SDK_PROOF")]
    WaitingForSdkProof,
    #[serde(rename = "QS_TO_BE_SENT_ONCHAIN")]
    ToBeSentOnchain,
    #[serde(rename = "QS_COMPLETE_ON_CHAIN")]
    CompleteOnchain,
    #[serde(rename = "QS_FAILED")]
    Failed,
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStatusResponse {
    pub status: QueryStatus,
    #[serde(default)]
    pub tx_hash: Option<H256>,
    #[serde(default)]
    pub message: Option<String>,
}

#[allow(async_fn_in_trait)]
pub trait Gateway {
    async fn prepare_query(
        &self,
        request: &PrepareQueryRequest,
    ) -> Result<PrepareQueryResponse, SdkError>;

    async fn submit_proof(&self, request: &SubmitProofRequest) -> Result<(), SdkError>;

    async fn query_status(
        &self,
        request: &QueryStatusRequest,
    ) -> Result<QueryStatusResponse, SdkError>;
}

/// How long, and how often, to ask the gateway whether the final proof landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` waits for as long as the gateway takes.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

/// Polls the gateway until the final proof for `query_key` is submitted on-chain
/// and returns the settlement transaction hash.
pub async fn wait_final_proof_submitted<G: Gateway>(
    gateway: &G,
    query_key: QueryKey,
    target_chain_id: u64,
    policy: &PollPolicy,
) -> Result<H256, SdkError> {
    let request = QueryStatusRequest {
        query_key,
        target_chain_id,
    };

    let poll = async {
        loop {
            let response = gateway.query_status(&request).await?;
            match response.status {
                QueryStatus::CompleteOnchain => {
                    return response.tx_hash.ok_or_else(|| SdkError::Service {
                        service: "gateway",
                        endpoint: "GetQueryStatus".to_owned(),
                        message: "query completed without a transaction hash".to_owned(),
                    });
                }
                QueryStatus::Failed => {
                    return Err(SdkError::QueryFailed {
                        request_id: query_key.query_hash,
                        message: response.message.unwrap_or_default(),
                    });
                }
                status => {
                    debug!("Query {:?} status {status:?}", query_key.query_hash);
                    tokio::time::sleep(policy.interval).await;
                }
            }
        }
    };

    match policy.timeout {
        Some(timeout) => tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| SdkError::Timeout(timeout))?,
        None => poll.await,
    }
}

#[derive(Deserialize)]
struct ErrMsg {
    code: i64,
    msg: String,
}

/// JSON-over-HTTP gateway client.
pub struct HttpGateway {
    url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        method: &str,
        body: &Req,
    ) -> Result<Resp, SdkError> {
        let http_err = |source| SdkError::Http {
            service: "gateway",
            endpoint: method.to_owned(),
            source,
        };

        let response = self
            .client
            .post(format!("{}/v1/{method}", self.url))
            .json(body)
            .send()
            .await
            .map_err(http_err)?;
        let status = response.status();
        let reply = response.bytes().await.map_err(http_err)?;

        decode_reply(status, &reply).map_err(|message| SdkError::Service {
            service: "gateway",
            endpoint: method.to_owned(),
            message,
        })
    }
}

/// Decodes a gateway reply. An `err` payload wins over the HTTP status, so
/// the gateway's own message survives a non-success response.
fn decode_reply<Resp: DeserializeOwned>(status: StatusCode, reply: &[u8]) -> Result<Resp, String> {
    let mut value: serde_json::Value = match serde_json::from_slice(reply) {
        Ok(value) => value,
        Err(err) if status.is_success() => return Err(format!("malformed reply: {err}")),
        Err(_) => return Err(format!("HTTP {status}")),
    };

    if let Some(err) = value.get_mut("err").map(serde_json::Value::take) {
        if !err.is_null() {
            let ErrMsg { code, msg } = serde_json::from_value(err)
                .map_err(|err| format!("malformed error: {err}"))?;
            return Err(format!("{msg} (code {code})"));
        }
    }
    if !status.is_success() {
        return Err(format!("HTTP {status}"));
    }

    serde_json::from_value(value).map_err(|err| err.to_string())
}

impl Gateway for HttpGateway {
    async fn prepare_query(
        &self,
        request: &PrepareQueryRequest,
    ) -> Result<PrepareQueryResponse, SdkError> {
        let response: PrepareQueryResponse = self.post("PrepareQuery", request).await?;
        info!(
            "Gateway accepted request {:?}, fee {} wei",
            response.query_key.query_hash, response.fee
        );
        Ok(response)
    }

    async fn submit_proof(&self, request: &SubmitProofRequest) -> Result<(), SdkError> {
        self.post::<_, serde_json::Value>("SubmitAppCircuitProof", request)
            .await
            .map(|_| ())
    }

    async fn query_status(
        &self,
        request: &QueryStatusRequest,
    ) -> Result<QueryStatusResponse, SdkError> {
        self.post("GetQueryStatus", request).await
    }
}
