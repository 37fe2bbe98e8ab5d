use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use notary_core::pow::leading_zero_hex_digits;
use notary_core::{Block, Ledger, LedgerConfig, LedgerError, LedgerService, MiningMode};
use serde::Serialize;
use serde_json::Value;
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "notary-cli")]
#[command(about = "Notarize records on an in-memory proof-of-work ledger")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Append payloads and print the resulting chain
    Notarize {
        #[command(flatten)]
        ledger: LedgerArgs,
        /// Resolve this hash back to its block after appending
        #[arg(long)]
        find: Option<String>,
    },
    /// Show that corrupting a copy of one block is detected
    Tamper {
        #[command(flatten)]
        ledger: LedgerArgs,
        /// Block whose hash is corrupted in the copy
        #[arg(long, default_value_t = 1)]
        index: usize,
    },
}

#[derive(Args, Debug)]
struct LedgerArgs {
    /// JSON payload to append; repeatable. Read one per line from stdin if omitted
    #[arg(long = "payload")]
    payloads: Vec<String>,
    /// Leading zero hex digits required of each block hash
    #[arg(long)]
    difficulty: Option<u32>,
    /// Search nonces on all cores
    #[arg(long)]
    parallel: bool,
    /// JSON ledger config; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

impl LedgerArgs {
    async fn config(&self) -> Result<LedgerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => LedgerConfig::default(),
        };
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if self.parallel {
            config.mining = MiningMode::Parallel;
        }
        Ok(config)
    }

    fn payloads(&self) -> Result<Vec<Value>> {
        let lines = if self.payloads.is_empty() {
            std::io::stdin()
                .lock()
                .lines()
                .collect::<std::io::Result<Vec<_>>>()?
        } else {
            self.payloads.clone()
        };
        lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).with_context(|| format!("invalid JSON payload: {l}")))
            .collect()
    }
}

/// One row of the explorer view.
#[derive(Serialize)]
struct BlockRow<'a> {
    index: u64,
    timestamp: u64,
    hash: &'a str,
    previous_hash: &'a str,
    nonce: u64,
    leading_zeros: usize,
    payload: &'a Value,
}

impl<'a> From<&'a Block> for BlockRow<'a> {
    fn from(b: &'a Block) -> Self {
        Self {
            index: b.index,
            timestamp: b.timestamp,
            hash: &b.hash,
            previous_hash: &b.previous_hash,
            nonce: b.nonce,
            leading_zeros: leading_zero_hex_digits(&b.hash),
            payload: &b.payload,
        }
    }
}

fn print_chain(blocks: &[Block]) -> Result<()> {
    let rows: Vec<BlockRow> = blocks.iter().map(BlockRow::from).collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn badge(valid: bool) -> &'static str {
    if valid {
        "Chain Valid"
    } else {
        "Chain Invalid"
    }
}

/// Append `payloads` through a background service. Ctrl-C abandons the block
/// being mined; everything committed before it is kept.
async fn build(config: LedgerConfig, payloads: Vec<Value>) -> Result<Ledger> {
    let ledger = Ledger::with_config(config)?;
    let service = LedgerService::spawn(ledger);
    let handle = service.handle();

    let appends = async {
        for payload in &payloads {
            let block = handle.append(payload).await?;
            info!("notarized block {} as {}", block.index, block.hash);
        }
        Ok::<_, LedgerError>(())
    };
    tokio::select! {
        res = appends => res?,
        _ = tokio::signal::ctrl_c() => warn!("interrupted, cancelling in-flight mining"),
    }
    Ok(service.shutdown().await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Notarize { ledger, find } => {
            let ledger = build(ledger.config().await?, ledger.payloads()?).await?;
            print_chain(ledger.blocks())?;
            println!("blocks: {}", ledger.len());
            println!("status: {}", badge(ledger.is_valid()));
            if let Some(hash) = find {
                match ledger.find_by_hash(&hash) {
                    Some(block) => println!(
                        "found: block {}\n{}",
                        block.index,
                        serde_json::to_string_pretty(&BlockRow::from(&block))?
                    ),
                    None => println!("found: no block with hash {hash}"),
                }
            }
        }
        Command::Tamper { ledger, index } => {
            let ledger = build(ledger.config().await?, ledger.payloads()?).await?;
            let mut copy = ledger.snapshot();
            let Some(block) = copy.get_mut(index) else {
                bail!("index {index} out of range, chain has {} blocks", ledger.len());
            };
            block.hash = "tampered".to_string();

            match ledger.validator().validate(&copy) {
                Ok(()) => println!("copy:   {}", badge(true)),
                Err(fault) => println!("copy:   {} ({fault})", badge(false)),
            }
            println!("ledger: {}", badge(ledger.is_valid()));
        }
    }
    Ok(())
}
