use std::sync::Arc;

use alloy::{primitives, sol, sol_types::SolCall};
use ethers::{
    core::k256::ecdsa::SigningKey,
    prelude::*,
    types::transaction::eip2718::TypedTransaction,
};
use log::{debug, info};

use crate::{error::PaymentError, request::PreparedRequest};

sol! {
    struct Callback {
        address target;
        uint64 gas;
    }

    function sendRequest(
        bytes32 proofId,
        uint64 nonce,
        address refundee,
        Callback callback,
        uint8 option
    ) external payable;
}

const MAX_FEE_TX_GAS: u64 = 1_000_000;
const MAX_GAS_PRICE_GWEI: u64 = 300;
/// Percentage applied to the node's gas estimate.
const GAS_MARGIN_PERCENT: u64 = 110;
const GWEI: u64 = 1_000_000_000;

/// ABI-encodes the `sendRequest` call that pays for a prepared request.
pub fn send_request_calldata(
    proof_id: H256,
    nonce: u64,
    refundee: Address,
    callback_target: Address,
    callback_gas: u64,
    option: u8,
) -> Bytes {
    let call = sendRequestCall {
        proofId: primitives::FixedBytes(proof_id.0),
        nonce,
        refundee: primitives::Address::from(refundee.0),
        callback: Callback {
            target: primitives::Address::from(callback_target.0),
            gas: callback_gas,
        },
        option,
    };
    Bytes::from(call.abi_encode())
}

/// Hook run between preparing a request and submitting its proof.
#[allow(async_fn_in_trait)]
pub trait FeePayer {
    /// Returns the hash of the fee transaction, if one was sent.
    async fn pay(&self, request: &PreparedRequest) -> Result<Option<H256>, PaymentError>;
}

/// Leaves the fee payment to the user.
pub struct NoFeePayment;

impl FeePayer for NoFeePayment {
    async fn pay(&self, request: &PreparedRequest) -> Result<Option<H256>, PaymentError> {
        if request.api_key_used {
            return Ok(None);
        }
        info!(
            "Don't forget to make the transaction that pays the fee ({} wei) by calling Brevis.sendRequest",
            request.fee_value
        );
        Ok(None)
    }
}

/// Sends the `sendRequest` transaction from a local wallet.
pub struct WalletFeePayer {
    pub eth_rpc_url: String,
    pub request_contract: Address,
    pub wallet: Wallet<SigningKey>,
}

/// Gas limit for the fee transaction: the estimate plus margin, refused when
/// either the network price or the padded estimate is out of bounds.
fn fee_tx_gas_limit(gas_price: U256, estimated_gas: U256) -> Result<U256, PaymentError> {
    let price_gwei = gas_price / U256::from(GWEI);
    if price_gwei > U256::from(MAX_GAS_PRICE_GWEI) {
        return Err(PaymentError::Gas(format!(
            "network gas price is {price_gwei} gwei, above the {MAX_GAS_PRICE_GWEI} gwei cap"
        )));
    }

    let gas_limit = estimated_gas
        .checked_mul(U256::from(GAS_MARGIN_PERCENT))
        .map(|padded| padded / U256::from(100))
        .ok_or(PaymentError::Gas("gas estimate overflows".to_owned()))?;
    if gas_limit > U256::from(MAX_FEE_TX_GAS) {
        return Err(PaymentError::Gas(format!(
            "fee transaction needs {gas_limit} gas, above the {MAX_FEE_TX_GAS} cap"
        )));
    }

    Ok(gas_limit)
}

impl FeePayer for WalletFeePayer {
    async fn pay(&self, request: &PreparedRequest) -> Result<Option<H256>, PaymentError> {
        if request.api_key_used {
            debug!("Partner flow selected, the fee is settled by the partner");
            return Ok(None);
        }

        let provider = Provider::<Http>::try_from(self.eth_rpc_url.as_str())
            .map_err(|err| PaymentError::Transaction(err.to_string()))?;
        let wallet = self.wallet.clone().with_chain_id(request.src_chain_id);
        let client = Arc::new(SignerMiddleware::new(provider.clone(), wallet));

        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.request_contract)
            .data(request.calldata.clone())
            .value(request.fee_value)
            .into();

        let estimated_gas = client
            .estimate_gas(&tx, None)
            .await
            .map_err(|err| PaymentError::Transaction(err.to_string()))?;
        info!("Estimated fee transaction gas cost: {}", estimated_gas);

        let gas_price = provider
            .get_gas_price()
            .await
            .map_err(|err| PaymentError::Gas(err.to_string()))?;
        let mut tx = tx;
        tx.set_gas(fee_tx_gas_limit(gas_price, estimated_gas)?);

        let pending_tx = client
            .send_transaction(tx, None)
            .await
            .map_err(|err| PaymentError::Transaction(err.to_string()))?;
        let tx_hash = pending_tx.tx_hash();
        info!("Fee transaction {tx_hash:?} was submitted and is now pending");

        let receipt = pending_tx
            .await
            .map_err(|err| PaymentError::Transaction(err.to_string()))?
            .ok_or(PaymentError::Transaction(
                "Missing transaction receipt".to_owned(),
            ))?;
        if receipt.status != Some(U64::from(1)) {
            return Err(PaymentError::Transaction(format!(
                "Fee transaction {tx_hash:?} reverted"
            )));
        }

        info!(
            "Fee paid in block {:?}",
            receipt.block_number.unwrap_or_default()
        );
        Ok(Some(tx_hash))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn calldata_starts_with_selector() {
        let calldata = send_request_calldata(
            H256::repeat_byte(0x11),
            7,
            Address::from_str("0x1bF81EA1F2F6Afde216cD3210070936401A14Bd4").unwrap(),
            Address::from_str("0xeec66d9b615ff84909be1cb1fe633cc26150417d").unwrap(),
            400_000,
            0,
        );

        assert_eq!(calldata[..4], sendRequestCall::SELECTOR);
        // selector + proofId + nonce + refundee + (target, gas) + option
        assert_eq!(calldata.len(), 4 + 32 * 6);
        assert_eq!(calldata[4..36], [0x11; 32]);
        assert_eq!(calldata[36 + 31], 7);
    }

    #[test]
    fn gas_limit_adds_margin() {
        let limit = fee_tx_gas_limit(U256::from(5 * GWEI), U256::from(100_000)).unwrap();
        assert_eq!(limit, U256::from(110_000));
    }

    #[test]
    fn gas_limit_refuses_expensive_networks() {
        assert!(matches!(
            fee_tx_gas_limit(U256::from(301 * GWEI), U256::from(21_000)),
            Err(PaymentError::Gas(_))
        ));
        assert!(matches!(
            fee_tx_gas_limit(U256::from(GWEI), U256::from(950_000)),
            Err(PaymentError::Gas(_))
        ));
    }
}
