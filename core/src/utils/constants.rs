pub const DEFAULT_RPC_URL: &str = "https://bsc-testnet.public.blastapi.io";
pub const DEFAULT_GATEWAY_URL: &str = "https://appsdkv3.brevis.network";
pub const DEFAULT_PROVER_URL: &str = "http://localhost:33247";

/// Relative to the user's home directory.
pub const DEFAULT_OUT_DIR: &str = "circuitOut/myBrevisApp";
/// Relative to the user's home directory.
pub const DEFAULT_SRS_DIR: &str = "kzgsrs";

pub const BSC_TESTNET_CHAIN_ID: u64 = 97;
pub const APP_CONTRACT_ADDR: &str = "0xeec66d9b615ff84909be1cb1fe633cc26150417d";
pub const REFUNDEE_ADDR: &str = "0x1bF81EA1F2F6Afde216cD3210070936401A14Bd4";
pub const CALLBACK_GAS_LIMIT: u64 = 400_000;
pub const PARTNER_KEY: &str = "TEST_ACCOUNT_AGE_KEY";

pub const DEFAULT_MIN_TRANSFER_AMOUNT: u64 = 500_000_000;
