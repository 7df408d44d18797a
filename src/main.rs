//! Chainpoint Proof Tool
//!
//! Command line front end for the proof engine: verify, encode, decode and
//! assemble proofs, or build a batch of them the way the proof generation
//! service does.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use chainpoint::{
    pipeline::{FragmentSource, PipelineConfig, ProofBatcher, ProofRequest, SourceError},
    proof::{
        binary, parse, schema, AnchorDepth, ProofAssembler, StageFragments, SubmittedHash,
    },
    VERSION,
};

/// Chainpoint proof tool
#[derive(Parser, Debug)]
#[command(name = "chainpoint-proof")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a proof and print the expected anchor values
    Parse {
        /// Proof file (JSON, hex or base64); `-` reads stdin
        input: PathBuf,
    },

    /// Encode a JSON proof to its binary text form
    Encode {
        /// JSON proof file; `-` reads stdin
        input: PathBuf,

        /// Text form of the binary proof
        #[arg(short, long, value_enum, default_value = "base64")]
        format: TextFormat,
    },

    /// Decode a hex or base64 binary proof to JSON
    Decode {
        /// Binary proof text file; `-` reads stdin
        input: PathBuf,
    },

    /// Assemble a proof from stored state fragments
    Assemble {
        /// Stage fragments file (JSON)
        fragments: PathBuf,

        /// Submitted hash (hex)
        #[arg(long)]
        hash: String,

        /// Node hash id
        #[arg(long)]
        hash_id_node: String,

        /// Core hash id
        #[arg(long)]
        hash_id_core: String,

        /// Proof depth (cal, btc, eth)
        #[arg(long, default_value = "cal")]
        depth: AnchorDepth,

        /// Base URI used for anchors stored without uris
        #[arg(long)]
        base_uri: Option<String>,

        /// Print the base64 binary form instead of JSON
        #[arg(long)]
        binary: bool,
    },

    /// Build every proof listed in a batch file
    Batch {
        /// Batch file (JSON array of jobs)
        input: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TextFormat {
    Hex,
    Base64,
}

/// One job in a batch file.
#[derive(Deserialize)]
struct BatchJob {
    #[serde(flatten)]
    submitted: SubmittedHash,
    depth: AnchorDepth,
    fragments: StageFragments,
}

/// Fragments loaded from a batch file, by core hash id.
struct FileSource {
    fragments: BTreeMap<String, StageFragments>,
}

impl FragmentSource for FileSource {
    fn fragments(
        &self,
        hash: &SubmittedHash,
        _depth: AnchorDepth,
    ) -> Result<StageFragments, SourceError> {
        self.fragments
            .get(&hash.hash_id_core)
            .cloned()
            .ok_or_else(|| SourceError(format!("no fragments for {}", hash.hash_id_core)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    debug!("chainpoint-proof v{}", VERSION);

    match cli.command {
        Commands::Parse { input } => {
            let text = read_input(&input)?;
            let parsed = if text.trim_start().starts_with('{') {
                let value: serde_json::Value =
                    serde_json::from_str(&text).context("proof is not valid JSON")?;
                parse(value)?
            } else {
                parse(text.as_str())?
            };
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }

        Commands::Encode { input, format } => {
            let value: serde_json::Value = serde_json::from_str(&read_input(&input)?)
                .context("proof is not valid JSON")?;
            let proof = schema::validate_value(value)?;
            let text = match format {
                TextFormat::Hex => binary::encode_hex(&proof)?,
                TextFormat::Base64 => binary::encode_base64(&proof)?,
            };
            println!("{}", text);
        }

        Commands::Decode { input } => {
            let proof = binary::decode(read_input(&input)?)?;
            println!("{}", proof.to_json_pretty()?);
        }

        Commands::Assemble {
            fragments,
            hash,
            hash_id_node,
            hash_id_core,
            depth,
            base_uri,
            binary: as_binary,
        } => {
            let fragments: StageFragments = serde_json::from_str(&read_input(&fragments)?)
                .context("fragments file is not valid JSON")?;
            let assembler = match base_uri {
                Some(uri) => ProofAssembler::with_base_uri(uri),
                None => PipelineConfig::from_env().assembler(),
            };
            let submitted = SubmittedHash {
                hash,
                hash_id_node,
                hash_id_core,
            };
            let proof = assembler.assemble(&submitted, &fragments, depth)?;
            if as_binary {
                println!("{}", binary::encode_base64(&proof)?);
            } else {
                println!("{}", proof.to_json_pretty()?);
            }
        }

        Commands::Batch { input } => run_batch(&input).await?,
    }

    Ok(())
}

async fn run_batch(input: &Path) -> Result<()> {
    let jobs: Vec<BatchJob> = serde_json::from_str(&read_input(input)?)
        .with_context(|| format!("invalid batch file {}", input.display()))?;

    let mut fragments = BTreeMap::new();
    let mut requests = Vec::with_capacity(jobs.len());
    for job in jobs {
        fragments.insert(job.submitted.hash_id_core.clone(), job.fragments);
        requests.push(ProofRequest {
            submitted: job.submitted,
            depth: job.depth,
        });
    }

    let config = PipelineConfig::from_env();
    info!(
        jobs = requests.len(),
        concurrency = config.concurrency,
        batch_size = config.batch_size,
        "starting proof batch"
    );
    let batcher = ProofBatcher::new(config, Arc::new(FileSource { fragments }));

    let mut failed = 0usize;
    for outcome in batcher.run(requests).await {
        let line = match outcome.result {
            Ok(built) => serde_json::json!({
                "hash_id_core": built.hash_id_core,
                "depth": built.depth,
                "proof": built.base64,
            }),
            Err(e) => {
                failed += 1;
                serde_json::json!({
                    "hash_id_core": outcome.hash_id_core,
                    "error": e.to_string(),
                })
            }
        };
        println!("{}", line);
    }

    if failed > 0 {
        bail!("{} proof(s) could not be built", failed);
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
