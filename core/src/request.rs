use ethers::types::{Address, Bytes, H256, U256};
use serde::Serialize;

use crate::{
    artifacts::checksum,
    eth::send_request_calldata,
    gateway::{PrepareQueryRequest, PrepareQueryResponse, QueryKey, QueryOption},
};

/// Everything about a request that is fixed by the deployment rather than
/// derived from the proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    pub src_chain_id: u64,
    pub dst_chain_id: u64,
    pub refundee: Address,
    pub app_contract: Address,
    pub callback_gas: u64,
    pub option: QueryOption,
    /// Partner flow key; `None` submits the request anonymously.
    pub partner_key: Option<String>,
}

/// A request accepted by the gateway, ready to be paid for and proven.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedRequest {
    pub query_key: QueryKey,
    pub src_chain_id: u64,
    pub dst_chain_id: u64,
    pub calldata: Bytes,
    pub fee_value: U256,
    pub api_key_used: bool,
}

impl PreparedRequest {
    pub fn request_id(&self) -> H256 {
        self.query_key.query_hash
    }
}

impl RequestParams {
    pub fn prepare_query(&self, verifying_key: &Bytes, public_witness: &Bytes) -> PrepareQueryRequest {
        PrepareQueryRequest {
            chain_id: self.src_chain_id,
            target_chain_id: self.dst_chain_id,
            vk_hash: checksum(verifying_key),
            public_witness: public_witness.clone(),
            callback_addr: self.app_contract,
            callback_gas: self.callback_gas,
            option: self.option,
            api_key: self.partner_key.clone().filter(|key| !key.is_empty()),
        }
    }

    /// Combines the gateway's answer with the local parameters into the
    /// `sendRequest` payload.
    pub fn prepared(&self, response: &PrepareQueryResponse) -> PreparedRequest {
        let calldata = send_request_calldata(
            response.query_key.query_hash,
            response.query_key.nonce,
            self.refundee,
            self.app_contract,
            self.callback_gas,
            self.option.as_u8(),
        );
        PreparedRequest {
            query_key: response.query_key,
            src_chain_id: self.src_chain_id,
            dst_chain_id: self.dst_chain_id,
            calldata,
            fee_value: U256::from(response.fee),
            api_key_used: self.partner_key.as_deref().is_some_and(|key| !key.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(partner_key: Option<&str>) -> RequestParams {
        RequestParams {
            src_chain_id: 97,
            dst_chain_id: 97,
            refundee: Address::repeat_byte(1),
            app_contract: Address::repeat_byte(2),
            callback_gas: 400_000,
            option: QueryOption::ZkMode,
            partner_key: partner_key.map(str::to_owned),
        }
    }

    #[test]
    fn partner_key_is_forwarded() {
        let request = params(Some("TEST_ACCOUNT_AGE_KEY"))
            .prepare_query(&Bytes::from(vec![1]), &Bytes::from(vec![2]));
        assert_eq!(request.api_key.as_deref(), Some("TEST_ACCOUNT_AGE_KEY"));
        assert_eq!(request.vk_hash, checksum(&[1]));
        assert_eq!(request.callback_addr, Address::repeat_byte(2));
    }

    #[test]
    fn empty_partner_key_is_anonymous() {
        let params = params(Some(""));
        assert_eq!(params.prepare_query(&Bytes::default(), &Bytes::default()).api_key, None);

        let prepared = params.prepared(&PrepareQueryResponse {
            query_key: QueryKey {
                query_hash: H256::repeat_byte(9),
                nonce: 4,
            },
            fee: 12,
        });
        assert!(!prepared.api_key_used);
        assert_eq!(prepared.fee_value, U256::from(12));
        assert_eq!(prepared.request_id(), H256::repeat_byte(9));
    }
}
