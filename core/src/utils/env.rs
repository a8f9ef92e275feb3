extern crate dotenv;
use dotenv::dotenv;
use log::debug;

use super::constants::{DEFAULT_GATEWAY_URL, DEFAULT_PROVER_URL, PARTNER_KEY};

/// Struct that is created by reading environment variables or, for some fields, from defined constants if the
/// corresponding environment variable is not defined.
///
/// - `gateway_url`: URL of the Brevis gateway the proof is submitted to
/// - `prover_url`: URL of the prover service that compiles circuits and generates proofs
/// - `partner_key`: Key identifying the partner when the partner flow is selected
/// - `request_contract_addr`: Address of the Brevis request contract, only needed to pay fees
/// - `keystore_path`: Path to the keystore used to sign the fee transaction
/// - `private_key`: Private key of the wallet used to sign the fee transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentVariables {
    pub gateway_url: String,
    pub prover_url: String,
    pub partner_key: String,
    pub request_contract_addr: Option<String>,
    pub keystore_path: Option<String>,
    pub private_key: Option<String>,
}

fn load_var_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => {
            debug!("Using default {}: {}", key, default);
            default.to_owned()
        }
    }
}

fn load_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

impl EnvironmentVariables {
    /// Creates the `EnvironmentVariables` struct from environment variables, loading a `.env`
    /// file first when one exists.
    ///
    /// Both `KEYSTORE_PATH` and `PRIVATE_KEY` may be set here; picking one is
    /// left to [`crate::utils::wallet::get_wallet`], which only runs when a fee is paid.
    pub fn new() -> EnvironmentVariables {
        if let Err(err) = dotenv() {
            debug!("No .env file loaded: {}", err);
        }
        Self::from_env()
    }

    /// Same as [`EnvironmentVariables::new`] without touching `.env`.
    pub fn from_env() -> EnvironmentVariables {
        EnvironmentVariables {
            gateway_url: load_var_or("BREVIS_GATEWAY_URL", DEFAULT_GATEWAY_URL),
            prover_url: load_var_or("PROVER_URL", DEFAULT_PROVER_URL),
            partner_key: load_var_or("BREVIS_PARTNER_KEY", PARTNER_KEY),
            request_contract_addr: load_optional("BREVIS_REQUEST_ADDR"),
            keystore_path: load_optional("KEYSTORE_PATH"),
            private_key: load_optional("PRIVATE_KEY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so that no other test races on the process environment.
    #[test]
    fn reads_overrides_and_tolerates_two_wallets() {
        std::env::set_var("BREVIS_GATEWAY_URL", "http://gateway.local");
        std::env::remove_var("PROVER_URL");
        std::env::remove_var("BREVIS_PARTNER_KEY");
        std::env::remove_var("KEYSTORE_PATH");
        std::env::set_var("PRIVATE_KEY", "");

        let vars = EnvironmentVariables::from_env();
        assert_eq!(vars.gateway_url, "http://gateway.local");
        assert_eq!(vars.prover_url, DEFAULT_PROVER_URL);
        assert_eq!(vars.partner_key, PARTNER_KEY);
        assert_eq!(vars.private_key, None);

        std::env::set_var("KEYSTORE_PATH", "/tmp/keystore");
        std::env::set_var("PRIVATE_KEY", "0x01");
        let vars = EnvironmentVariables::from_env();
        assert_eq!(vars.keystore_path.as_deref(), Some("/tmp/keystore"));
        assert_eq!(vars.private_key.as_deref(), Some("0x01"));

        std::env::remove_var("KEYSTORE_PATH");
        std::env::remove_var("PRIVATE_KEY");
        std::env::remove_var("BREVIS_GATEWAY_URL");
    }
}
