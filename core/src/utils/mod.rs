/// Defaults baked into the quickstart.
pub mod constants;
/// Environment configuration.
pub mod env;
/// Wallet used to pay request fees.
pub mod wallet;
