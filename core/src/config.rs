use std::{path::PathBuf, str::FromStr};

use ethers::types::{Address, H256, U256};

use crate::{
    circuit::AppCircuit,
    error::ConfigError,
    gateway::{PollPolicy, QueryOption},
    request::RequestParams,
    utils::constants::{
        APP_CONTRACT_ADDR, BSC_TESTNET_CHAIN_ID, CALLBACK_GAS_LIMIT, DEFAULT_OUT_DIR,
        DEFAULT_SRS_DIR, REFUNDEE_ADDR,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileConfig {
    pub circuit: AppCircuit,
    pub out_dir: PathBuf,
    pub srs_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProveConfig {
    pub circuit: AppCircuit,
    pub out_dir: PathBuf,
    pub tx_hash: H256,
    pub request: RequestParams,
    pub poll: PollPolicy,
}

fn home_relative(path: &str) -> Result<PathBuf, ConfigError> {
    dirs_next::home_dir()
        .map(|home| home.join(path))
        .ok_or(ConfigError("Couldn't determine the home directory".to_owned()))
}

pub fn default_out_dir() -> Result<PathBuf, ConfigError> {
    home_relative(DEFAULT_OUT_DIR)
}

pub fn default_srs_dir() -> Result<PathBuf, ConfigError> {
    home_relative(DEFAULT_SRS_DIR)
}

pub fn parse_tx_hash(value: &str) -> Result<H256, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError("--tx is required".to_owned()));
    }
    H256::from_str(value).map_err(|err| ConfigError(format!("Invalid tx hash {value}: {err}")))
}

pub fn parse_address(value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value).map_err(|err| ConfigError(format!("Invalid address {value}: {err}")))
}

/// Parses a decimal token amount of up to 256 bits.
pub fn parse_amount(value: &str) -> Result<U256, ConfigError> {
    U256::from_dec_str(value).map_err(|err| ConfigError(format!("Invalid amount {value}: {err}")))
}

/// Request parameters of the quickstart deployment on BSC testnet.
pub fn default_request_params(partner_key: Option<String>) -> Result<RequestParams, ConfigError> {
    Ok(RequestParams {
        src_chain_id: BSC_TESTNET_CHAIN_ID,
        dst_chain_id: BSC_TESTNET_CHAIN_ID,
        refundee: parse_address(REFUNDEE_ADDR)?,
        app_contract: parse_address(APP_CONTRACT_ADDR)?,
        callback_gas: CALLBACK_GAS_LIMIT,
        option: QueryOption::ZkMode,
        partner_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_hash_accepts_prefixed_hex() {
        let hash = parse_tx_hash(&format!("0x{}", "ab".repeat(32))).unwrap();
        assert_eq!(hash, H256::repeat_byte(0xab));
    }

    #[test]
    fn tx_hash_is_required_and_validated() {
        assert!(parse_tx_hash("").is_err());
        assert!(parse_tx_hash("0x1234").is_err());
        assert!(parse_tx_hash("not hex").is_err());
    }

    #[test]
    fn amount_goes_beyond_64_bits() {
        let amount = parse_amount("25000000000000000000").unwrap();
        assert_eq!(amount, U256::from(25u64) * U256::exp10(18));
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("0x10").is_err());
    }

    #[test]
    fn default_params_target_bsc_testnet() {
        let params = default_request_params(None).unwrap();
        assert_eq!(params.src_chain_id, 97);
        assert_eq!(params.dst_chain_id, 97);
        assert_eq!(params.callback_gas, 400_000);
        assert_eq!(params.partner_key, None);
    }
}
