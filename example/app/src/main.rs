use std::{path::PathBuf, process, time::Duration};

use brevis_quickstart_core::{
    circuit::{AppCircuit, TRANSFER_EVENT_ID},
    config::{
        default_out_dir, default_request_params, default_srs_dir, parse_address, parse_amount,
        parse_tx_hash, CompileConfig, ProveConfig,
    },
    error::{ConfigError, Error},
    eth::{NoFeePayment, WalletFeePayer},
    evidence::TransferFilter,
    gateway::{HttpGateway, PollPolicy, DEFAULT_POLL_INTERVAL},
    prover::RemoteProver,
    rpc::EthRpcClient,
    sdk::{compile, prove, ProveOutcome},
    utils::{
        constants::{DEFAULT_MIN_TRANSFER_AMOUNT, DEFAULT_RPC_URL},
        env::EnvironmentVariables,
        wallet::get_wallet,
    },
};
use clap::{Parser, ValueEnum};
use ethers::types::U256;
use log::{error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Compile,
    Prove,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum CircuitKind {
    /// Account age: the whole transaction is the evidence
    Age,
    /// Token transfer: recipient and amount of the first large enough transfer log
    Transfer,
}

#[derive(Parser, Debug)]
#[command(version, about = "Brevis quickstart: compile a circuit or prove a transaction")]
struct Cli {
    /// compile or prove
    #[arg(long, value_enum)]
    mode: Mode,

    /// Compilation output dir [default: $HOME/circuitOut/myBrevisApp]
    #[arg(long)]
    out: Option<PathBuf>,

    /// Where to cache the KZG SRS [default: $HOME/kzgsrs]
    #[arg(long)]
    srs: Option<PathBuf>,

    /// Tx hash to prove
    #[arg(long, default_value = "")]
    tx: String,

    /// Ethereum JSON-RPC URL
    #[arg(long, default_value = DEFAULT_RPC_URL)]
    rpc: String,

    /// Use the Brevis partner flow
    #[arg(long = "brevis-partner")]
    brevis_partner: bool,

    #[arg(long, value_enum, default_value_t = CircuitKind::Age)]
    circuit: CircuitKind,

    /// Token contract whose transfer logs are scanned (transfer circuit only)
    #[arg(long)]
    token: Option<String>,

    /// Minimum transferred amount (transfer circuit only)
    #[arg(
        long,
        value_parser = parse_amount,
        default_value_t = U256::from(DEFAULT_MIN_TRANSFER_AMOUNT)
    )]
    min_amount: U256,

    /// Give up waiting for the final proof after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Pay the request fee from the wallet in PRIVATE_KEY or KEYSTORE_PATH
    #[arg(long)]
    pay_fee: bool,
}

fn app_circuit(cli: &Cli) -> Result<AppCircuit, ConfigError> {
    match cli.circuit {
        CircuitKind::Age => Ok(AppCircuit::Age),
        CircuitKind::Transfer => {
            let token = cli
                .token
                .as_deref()
                .ok_or(ConfigError("--token is required for the transfer circuit".to_owned()))?;
            Ok(AppCircuit::TokenTransfer(TransferFilter {
                token: parse_address(token)?,
                event_id: TRANSFER_EVENT_ID
                    .parse()
                    .map_err(|err| ConfigError(format!("Invalid transfer event id: {err}")))?,
                min_amount: cli.min_amount,
            }))
        }
    }
}

fn exit_on_err<T>(result: Result<T, impl Into<Error>>) -> T {
    result.map_err(Into::into).unwrap_or_else(|err: Error| {
        error!("{}", err);
        process::exit(1);
    })
}

async fn run_compile(cli: &Cli, env: &EnvironmentVariables) -> Result<(), Error> {
    let config = CompileConfig {
        circuit: app_circuit(cli)?,
        out_dir: cli.out.clone().map_or_else(default_out_dir, Ok)?,
        srs_dir: cli.srs.clone().map_or_else(default_srs_dir, Ok)?,
    };
    let prover = RemoteProver::new(&env.prover_url);
    compile(&prover, &config).await?;
    info!("Compilation output saved to {}", config.out_dir.display());
    Ok(())
}

async fn run_prove(cli: &Cli, env: &EnvironmentVariables) -> Result<ProveOutcome, Error> {
    let partner_key = cli.brevis_partner.then(|| env.partner_key.clone());
    let config = ProveConfig {
        circuit: app_circuit(cli)?,
        out_dir: cli.out.clone().map_or_else(default_out_dir, Ok)?,
        tx_hash: parse_tx_hash(&cli.tx)?,
        request: default_request_params(partner_key)?,
        poll: PollPolicy {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: cli.timeout_secs.map(Duration::from_secs),
        },
    };

    let chain = EthRpcClient::new(&cli.rpc)?;
    let prover = RemoteProver::new(&env.prover_url);
    let gateway = HttpGateway::new(&env.gateway_url);

    if cli.pay_fee && !cli.brevis_partner {
        let request_contract = env
            .request_contract_addr
            .as_deref()
            .ok_or(ConfigError("--pay-fee needs BREVIS_REQUEST_ADDR".to_owned()))?;
        let payer = WalletFeePayer {
            eth_rpc_url: cli.rpc.clone(),
            request_contract: parse_address(request_contract)?,
            wallet: get_wallet(
                config.request.src_chain_id,
                env.keystore_path.as_deref(),
                env.private_key.as_deref(),
            )?,
        };
        prove(&config, &chain, &prover, &gateway, &payer).await
    } else {
        if cli.pay_fee {
            warn!("--pay-fee is ignored in the partner flow");
        }
        prove(&config, &chain, &prover, &gateway, &NoFeePayment).await
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let env = EnvironmentVariables::new();

    let run = async {
        match cli.mode {
            Mode::Compile => run_compile(&cli, &env).await,
            Mode::Prove => run_prove(&cli, &env).await.map(|outcome| {
                info!(
                    "Request {:?} settled in {:?}, proof at {}",
                    outcome.request.request_id(),
                    outcome.settlement_tx,
                    outcome.proof_path.display()
                );
            }),
        }
    };

    tokio::select! {
        result = run => exit_on_err(result),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted");
            process::exit(130);
        }
    }
}
