use aa_analysis::{AaAnalyzer, AaTransactionResult, AnalyzerConfig, TransferRecord};
use aa_data::{Network, RpcReader};
use aa_decode::normalize::{format_gwei, format_units};
use aa_decode::{extract_user_operations, CallResolver, DecodedCall, ToValue, DEFAULT_MAX_DEPTH};
use alloy::primitives::{Address, Bytes, B256, U256};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "aa-decode")]
#[command(about = "Decode ERC-4337 bundle transactions")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a transaction and decode its user operations, events and transfers.
    Decode(DecodeArgs),
    /// Decode raw call data offline.
    Calldata(CalldataArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Transaction hash.
    hash: B256,

    #[arg(long, value_enum, default_value = "eth")]
    network: Network,

    /// RPC endpoint; overrides AA_ETH_RPC_URL / AA_BSC_RPC_URL.
    #[arg(long)]
    rpc_url: Option<String>,

    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,
}

#[derive(Args, Debug)]
struct CalldataArgs {
    /// Hex call data, with or without 0x.
    data: Bytes,

    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    match cli.command {
        Commands::Decode(args) => handle_decode(args).await,
        Commands::Calldata(args) => handle_calldata(args),
    }
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .wrap_err("failed to initialize tracing filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn handle_decode(args: DecodeArgs) -> Result<()> {
    let rpc_url = args.network.rpc_url(args.rpc_url.as_deref());
    let reader = RpcReader::new(&rpc_url, args.network)?;
    let analyzer = AaAnalyzer::with_config(reader, args.network, AnalyzerConfig::default());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .wrap_err("failed to create progress style")?,
    );
    pb.set_message(format!("decoding {} on {}", args.hash, args.network));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let outcome = analyzer.decode(args.hash).await;
    pb.finish_and_clear();

    let result = match outcome {
        Ok(result) => result,
        Err(err) => {
            let kind = err.kind();
            return Err(err).wrap_err(format!("decode failed [{kind}]"));
        }
    };

    match args.output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result.to_value().into_json())
                .wrap_err("failed to serialize result to JSON")?;
            println!("{json}");
        }
        OutputFormat::Table => print_result(&result),
    }

    info!(
        hash = %result.hash,
        user_operations = result.user_operations.len(),
        transfers = result.transfers.len(),
        "decode command completed"
    );
    Ok(())
}

fn handle_calldata(args: CalldataArgs) -> Result<()> {
    let resolver = CallResolver::new(args.max_depth);
    let value = match extract_user_operations(&args.data, &resolver) {
        Ok(handle_ops) => handle_ops.to_value(),
        Err(_) => resolver.resolve(&args.data).to_value(),
    };

    let json = serde_json::to_string_pretty(&value.into_json())
        .wrap_err("failed to serialize decoded call data")?;
    println!("{json}");
    Ok(())
}

fn print_result(result: &AaTransactionResult) {
    let mut summary = Table::new();
    summary.load_preset(UTF8_BORDERS_ONLY);
    summary.set_header(vec!["Field", "Value"]);

    let entry_point = match result.known_entry_point {
        Some(label) => format!("{} (EntryPoint {label})", result.entry_point),
        None => format!("{} (unrecognized)", result.entry_point),
    };
    let timestamp = result
        .timestamp
        .and_then(|ts| chrono::DateTime::from_timestamp(ts as i64, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let native = result.network.native_symbol();

    summary.add_row(vec!["Transaction".to_string(), result.hash.to_string()]);
    summary.add_row(vec!["Network".to_string(), result.network.to_string()]);
    summary.add_row(vec![
        "Block".to_string(),
        result
            .block_number
            .map_or_else(|| "N/A".to_string(), |b| b.to_string()),
    ]);
    summary.add_row(vec!["Timestamp".to_string(), timestamp]);
    summary.add_row(vec!["EntryPoint".to_string(), entry_point]);
    summary.add_row(vec![
        "Layout".to_string(),
        result.entry_point_version.to_string(),
    ]);
    summary.add_row(vec!["Bundler".to_string(), result.bundler.to_string()]);
    summary.add_row(vec!["Beneficiary".to_string(), result.beneficiary.to_string()]);
    summary.add_row(vec!["Gas used".to_string(), result.gas_used.to_string()]);
    summary.add_row(vec![
        "Gas price".to_string(),
        format!("{} gwei", format_gwei(U256::from(result.gas_price))),
    ]);
    summary.add_row(vec![
        "Fee".to_string(),
        format!(
            "{} {native}",
            format_units(result.fee(), result.network.native_decimals())
        ),
    ]);
    summary.add_row(vec![
        "User operations".to_string(),
        result.user_operations.len().to_string(),
    ]);
    println!("\n{summary}\n");

    let mut ops = Table::new();
    ops.load_preset(UTF8_BORDERS_ONLY);
    ops.set_header(vec!["#", "Sender", "Nonce", "Paymaster", "Max fee (gwei)", "Calls"]);
    for parsed in &result.user_operations {
        let mut lines = Vec::new();
        describe_call(&parsed.decoded_call_data, 0, &mut lines);
        ops.add_row(vec![
            parsed.index.to_string(),
            truncate_hash(&parsed.op.sender.to_string()),
            parsed.op.nonce.to_string(),
            parsed
                .paymaster
                .map_or_else(|| "-".to_string(), |p| truncate_hash(&p.to_string())),
            format_gwei(parsed.op.max_fee_per_gas),
            lines.join("\n"),
        ]);
    }
    println!("{ops}\n");

    if !result.events.is_empty() {
        let mut events = Table::new();
        events.load_preset(UTF8_BORDERS_ONLY);
        events.set_header(vec!["Event", "Sender", "Detail"]);
        for event in &result.events {
            let (sender, detail) = event_columns(event);
            events.add_row(vec![event.name().to_string(), sender, detail]);
        }
        println!("{events}\n");
    }

    if !result.transfers.is_empty() {
        let mut transfers = Table::new();
        transfers.load_preset(UTF8_BORDERS_ONLY);
        transfers.set_header(vec!["Source", "Token", "From", "To", "Amount", "Decimals"]);
        for transfer in &result.transfers {
            transfers.add_row(transfer_columns(transfer));
        }
        println!("{transfers}\n");
    }

    if !result.contract_interactions.is_empty() {
        let contracts: Vec<String> = result
            .contract_interactions
            .iter()
            .map(Address::to_string)
            .collect();
        println!("Contracts touched: {}\n", contracts.join(", "));
    }
}

fn event_columns(event: &aa_analysis::EntryPointEvent) -> (String, String) {
    use aa_analysis::EntryPointEvent as E;

    match event {
        E::UserOperation {
            sender,
            success,
            actual_gas_cost,
            ..
        } => (
            truncate_hash(&sender.to_string()),
            format!(
                "{} gas cost {}",
                if *success { "success" } else { "failed" },
                actual_gas_cost
            ),
        ),
        E::AccountDeployed {
            sender, factory, ..
        } => (
            truncate_hash(&sender.to_string()),
            format!("factory {}", truncate_hash(&factory.to_string())),
        ),
        E::RevertReason {
            sender,
            revert_reason,
            ..
        } => (truncate_hash(&sender.to_string()), revert_reason.to_string()),
        E::BeforeExecution => ("-".to_string(), String::new()),
    }
}

fn transfer_columns(transfer: &TransferRecord) -> Vec<String> {
    let token = match transfer.token.contract() {
        Some(address) => format!("{} ({})", transfer.symbol, truncate_hash(&address.to_string())),
        None => transfer.symbol.clone(),
    };
    vec![
        transfer.source.as_str().to_string(),
        token,
        truncate_hash(&transfer.from.to_string()),
        truncate_hash(&transfer.to.to_string()),
        transfer.formatted_amount(),
        format!("{} ({})", transfer.decimals, transfer.decimals_source.as_str()),
    ]
}

/// Renders a call tree as indented lines.
fn describe_call(decoded: &DecodedCall, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match decoded {
        DecodedCall::RoutedCall(routed) => {
            lines.push(format!("{indent}{} ({} calls)", routed.route.name(), routed.calls.len()));
            for inner in &routed.calls {
                let target = inner
                    .target
                    .map_or_else(|| "self".to_string(), |t| truncate_hash(&t.to_string()));
                let value = if inner.value.is_zero() {
                    String::new()
                } else {
                    format!(" value {}", inner.value)
                };
                lines.push(format!("{indent}  -> {target}{value}"));
                describe_call(&inner.decoded, depth + 2, lines);
            }
        }
        DecodedCall::UnknownFunction { selector, .. } => {
            lines.push(format!("{indent}unknown {selector}"));
        }
        other => {
            let amount = other
                .leaf_formatted_amount()
                .map(|a| format!(" {a}"))
                .unwrap_or_default();
            lines.push(format!("{indent}{}{amount}", other.kind()));
        }
    }
}

/// Truncate a hex hash/address for compact table display.
fn truncate_hash(hash: &str) -> String {
    if hash.len() > 14 {
        format!("{}…{}", &hash[..8], &hash[hash.len() - 4..])
    } else {
        hash.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_hash_keeps_short_values() {
        assert_eq!(truncate_hash("0x1234"), "0x1234");
        assert_eq!(
            truncate_hash("0xdAC17F958D2ee523a2206206994597C13D831ec7"),
            "0xdAC17F…1ec7"
        );
    }

    #[test]
    fn cli_parses_decode_arguments() {
        let cli = Cli::try_parse_from([
            "aa-decode",
            "decode",
            "0x00000000000000000000000000000000000000000000000000000000000000ab",
            "--network",
            "bsc",
            "--output",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Decode(args) => {
                assert_eq!(args.network, Network::Bsc);
                assert!(matches!(args.output, OutputFormat::Json));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn describe_call_indents_nested_calls() {
        let data = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]);
        let decoded = CallResolver::default().resolve(&data);
        let mut lines = Vec::new();
        describe_call(&decoded, 0, &mut lines);
        assert_eq!(lines, vec!["unknown 0xdeadbeef".to_string()]);
    }
}
