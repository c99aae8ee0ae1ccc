//! evmsift CLI — decode captured EVM block data against an ABI directory.
//!
//! # Commands
//! ```
//! evmsift decode-block --block <block.json> --abi-dir <dir> [--lookup]
//! evmsift decode-call  --calldata <hex> --address <addr> --abi-dir <dir>
//! evmsift decode-log   --topics <...> --data <hex> --address <addr> --abi-dir <dir>
//! evmsift selector     --kind function|event --signature "transfer(address,uint256)"
//! evmsift contracts    --abi-dir <dir>
//! ```
//!
//! `decode-block` persists newly discovered selectors back into the ABI
//! directory, exactly as an extraction run would.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use evmsift_abi::{
    parse_signature, entry_selector, AbiKind, AbiStore, HttpSignatureSource, Selector,
};
use evmsift_core::source::RawBlock;
use evmsift_decode::{decode_call, decode_log, parse_topics, prettify, BlockDecoder};

#[derive(Parser)]
#[command(
    name = "evmsift",
    about = "ABI-driven decoder for EVM blocks, calls, and event logs",
    long_about = "
evmsift: decode transaction calls and event logs against per-contract ABI
files, normalize the results, and emit flat warehouse records.

The ABI directory holds one <checksummed-address>.json file per contract.
Unknown selectors can be resolved through a signature database with
--lookup; discoveries are written back to the ABI directory.

ENVIRONMENT VARIABLES:
  RUST_LOG    tracing filter, e.g. info,evmsift_decode=debug
",
    version
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode every call and log in a captured block JSON file
    #[command(name = "decode-block")]
    DecodeBlock {
        /// Path to the block JSON file (camelCase RPC-style fields)
        #[arg(long)]
        block: PathBuf,
        /// Directory containing <address>.json ABI files
        #[arg(long, default_value = "./abis")]
        abi_dir: PathBuf,
        /// Resolve unknown selectors through the signature database
        #[arg(long)]
        lookup: bool,
        /// Signature database base URL
        #[arg(long, default_value = evmsift_abi::lookup::DEFAULT_BASE_URL)]
        lookup_url: String,
        /// Disambiguate overloaded selectors with a table-name suffix
        #[arg(long)]
        overload_suffix: bool,
    },

    /// Decode one function call's calldata
    #[command(name = "decode-call")]
    DecodeCall {
        /// Raw calldata (0x-prefixed hex, selector included)
        #[arg(long)]
        calldata: String,
        /// Contract address the call targets
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "./abis")]
        abi_dir: PathBuf,
    },

    /// Decode one event log from raw topics and data
    #[command(name = "decode-log")]
    DecodeLog {
        /// topics[0] = event signature hash, topics[1..] = indexed params
        #[arg(long, num_args = 1..)]
        topics: Vec<String>,
        /// Non-indexed params (hex, 0x-prefixed)
        #[arg(long, default_value = "0x")]
        data: String,
        /// Contract address that emitted the log
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "./abis")]
        abi_dir: PathBuf,
    },

    /// Compute the selector for a signature string
    Selector {
        /// "function" or "event"
        #[arg(long, default_value = "function")]
        kind: String,
        /// e.g. "transfer(address,uint256)"
        #[arg(long)]
        signature: String,
    },

    /// List known contracts in an ABI directory
    Contracts {
        #[arg(long, default_value = "./abis")]
        abi_dir: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let raw = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(raw).with_context(|| format!("'{s}' is not valid hex"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::DecodeBlock {
            block,
            abi_dir,
            lookup,
            lookup_url,
            overload_suffix,
        } => {
            let content = std::fs::read_to_string(&block)
                .with_context(|| format!("cannot read {}", block.display()))?;
            let raw: RawBlock =
                serde_json::from_str(&content).context("block JSON does not parse")?;
            let store = Arc::new(
                AbiStore::load(&abi_dir)
                    .with_context(|| format!("cannot load ABI dir {}", abi_dir.display()))?,
            );
            let mut decoder =
                BlockDecoder::new(store).with_overload_suffix(overload_suffix);
            if lookup {
                let source = HttpSignatureSource::new().with_base(lookup_url);
                decoder = decoder.with_lookup(Arc::new(source));
            }
            let records = decoder
                .decode_block(&raw)
                .await
                .context("block decode failed")?;
            for record in &records {
                println!("{}", serde_json::to_string(record)?);
            }
            Ok(())
        }

        Commands::DecodeCall {
            calldata,
            address,
            abi_dir,
        } => {
            let input = decode_hex(&calldata)?;
            if input.len() < 4 {
                return Err(anyhow!("calldata shorter than a 4-byte selector"));
            }
            let store = AbiStore::load(&abi_dir)?;
            let selector = Selector::from_bytes(&input[..4]);
            let entry = store
                .resolve(&address, &selector)
                .ok_or_else(|| anyhow!("selector {selector} is not known for {address}"))?;
            let meta = store
                .meta(&address)
                .ok_or_else(|| anyhow!("unknown contract {address}"))?;
            let mut fields = decode_call(&entry, &input[4..], false)?;
            prettify(&meta, &mut fields, &entry, &selector);
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "function": entry.name,
                    "selector": selector.to_hex(),
                    "inputs": fields,
                }))?
            );
            Ok(())
        }

        Commands::DecodeLog {
            topics,
            data,
            address,
            abi_dir,
        } => {
            if topics.is_empty() {
                return Err(anyhow!("at least topics[0] is required"));
            }
            let store = AbiStore::load(&abi_dir)?;
            let selector =
                Selector::from_hex(&topics[0]).context("topics[0] is not valid hex")?;
            let entry = store
                .resolve(&address, &selector)
                .ok_or_else(|| anyhow!("topic {selector} is not known for {address}"))?;
            let meta = store
                .meta(&address)
                .ok_or_else(|| anyhow!("unknown contract {address}"))?;
            let param_topics = parse_topics(&topics[1..])?;
            let payload = decode_hex(&data)?;
            let decoded = decode_log(&entry, &param_topics, &payload)?;
            let mut fields = decoded.fields;
            prettify(&meta, &mut fields, &entry, &selector);
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "event": decoded.name,
                    "topic": selector.to_hex(),
                    "recovered_indexed": decoded.recovered,
                    "fields": fields,
                }))?
            );
            Ok(())
        }

        Commands::Selector { kind, signature } => {
            let kind = match kind.as_str() {
                "function" => AbiKind::Function,
                "event" => AbiKind::Event,
                other => return Err(anyhow!("kind must be function or event, got '{other}'")),
            };
            let entry = parse_signature(kind, &signature)?;
            let selector = entry_selector(&entry)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "signature": entry.signature(),
                    "selector": selector.to_hex(),
                    "inputs": entry.inputs,
                }))?
            );
            Ok(())
        }

        Commands::Contracts { abi_dir } => {
            let store = AbiStore::load(&abi_dir)?;
            for contract in store.contracts() {
                println!("{}", serde_json::to_string(&contract)?);
            }
            Ok(())
        }
    }
}
