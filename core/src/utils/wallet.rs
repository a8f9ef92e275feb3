use ethers::{
    prelude::k256::ecdsa::SigningKey,
    signers::{LocalWallet, Signer, Wallet},
};

use log::info;
use zeroize::Zeroizing;

use crate::error::PaymentError;

/// Returns the `Wallet` struct defined in the `ethers` crate.
/// This wallet is used to sign the transaction that pays a request's fee.
///
/// If `keystore_path` is defined it stops execution, prompts on the TTY and then reads the password from TTY.
///
/// Returns `Err` if:
/// - `keystore_path` is not a valid path to a keystore
/// - `keystore_path` is defined and the password read from the TTY is not valid
/// - `private_key` is not a valid Ethereum private key
/// - Both or neither of `keystore_path` and `private_key` are defined
pub fn get_wallet(
    chain_id: u64,
    keystore_path: Option<&str>,
    private_key: Option<&str>,
) -> Result<Wallet<SigningKey>, PaymentError> {
    match (keystore_path, private_key) {
        (Some(_), Some(_)) => Err(PaymentError::Wallet(
            "Both keystore and private key env. variables are defined. Choose only one."
                .to_owned(),
        )),
        (Some(keystore_path), None) => {
            info!("Using keystore wallet");
            let password = Zeroizing::new(
                rpassword::prompt_password("Please enter your keystore password:")
                    .map_err(|err| PaymentError::Wallet(err.to_string()))?,
            );
            let wallet = Wallet::decrypt_keystore(keystore_path, password.as_str())
                .map_err(|err| PaymentError::Wallet(err.to_string()))?;
            Ok(wallet.with_chain_id(chain_id))
        }
        (None, Some(private_key)) => {
            info!("Using private key wallet");
            let wallet = private_key
                .parse::<LocalWallet>()
                .map_err(|err| PaymentError::Wallet(err.to_string()))?;
            Ok(wallet.with_chain_id(chain_id))
        }
        (None, None) => Err(PaymentError::Wallet(
            "Fee payment was requested but couldn't find KEYSTORE_PATH or PRIVATE_KEY.".to_owned(),
        )),
    }
}
