use ethers::{
    providers::{Http, Middleware, Provider},
    types::{Transaction, TransactionReceipt, H256},
};
use log::debug;

use crate::error::RpcError;

/// Read access to the chain data a proving run needs.
#[allow(async_fn_in_trait)]
pub trait ChainClient {
    async fn transaction_by_hash(&self, hash: H256) -> Result<Transaction, RpcError>;
    async fn transaction_receipt(&self, hash: H256) -> Result<TransactionReceipt, RpcError>;
}

/// JSON-RPC client backed by an ethers HTTP provider. Opened once per run.
pub struct EthRpcClient {
    provider: Provider<Http>,
}

impl EthRpcClient {
    pub fn new(rpc_url: &str) -> Result<Self, RpcError> {
        let provider = Provider::<Http>::try_from(rpc_url).map_err(|err| RpcError::InvalidUrl {
            url: rpc_url.to_owned(),
            reason: err.to_string(),
        })?;
        Ok(Self { provider })
    }
}

impl ChainClient for EthRpcClient {
    async fn transaction_by_hash(&self, hash: H256) -> Result<Transaction, RpcError> {
        debug!("Querying transaction {hash:?}");
        self.provider
            .get_transaction(hash)
            .await?
            .ok_or(RpcError::MissingTransaction(hash))
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<TransactionReceipt, RpcError> {
        debug!("Querying receipt of {hash:?}");
        self.provider
            .get_transaction_receipt(hash)
            .await?
            .ok_or(RpcError::MissingReceipt(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_url() {
        let err = EthRpcClient::new("not a url").err().unwrap();
        assert!(matches!(err, RpcError::InvalidUrl { .. }));
    }

    #[test]
    fn accepts_http_url() {
        assert!(EthRpcClient::new("https://bsc-testnet.public.blastapi.io").is_ok());
    }
}
