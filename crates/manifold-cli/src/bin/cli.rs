use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use manifold::{logging::init_logging, Manifest, ManifestHeader, ProtocolConfig, StagingLedger};
use manifold_crypto::{ContentAddresser, Prediction};
use manifold_types::{keccak256, parse_address, Address, Route, Selector};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "manifold-cli")]
#[command(about = "Manifold routing manifest tooling", long_about = None)]
struct Cli {
    /// Protocol configuration file (TOML, JSON or YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the 4-byte selector of a function signature
    Selector { signature: String },

    /// Predict the staging address of facet bytecode
    Predict {
        /// Runtime bytecode as hex, or @path to a file holding hex
        bytecode: String,

        #[arg(long, value_parser = parse_address)]
        deployer: Option<Address>,

        /// Namespace label; hashed into the salt
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Build a manifest from a JSON list of routes
    Build {
        routes: PathBuf,

        #[arg(long)]
        out: PathBuf,

        /// Manifest this one replaces; its hash becomes previousHash
        #[arg(long)]
        previous: Option<PathBuf>,
    },

    /// Rebuild a manifest's Merkle root from its routes
    Root { manifest: PathBuf },

    /// Check embedded roots and, optionally, the link to the previous manifest
    VerifyManifest {
        manifest: PathBuf,

        #[arg(long)]
        previous: Option<PathBuf>,
    },

    /// Emit the route proof for one selector
    Proof { manifest: PathBuf, selector: Selector },

    /// Hash arbitrary hex data with keccak256
    Hash { data: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RootReport {
    root: String,
    leaf_count: usize,
    depth: usize,
    manifest_hash: String,
}

fn read_hex(input: &str) -> Result<Vec<u8>> {
    let text = match input.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {}", path))?,
        None => input.to_string(),
    };
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).context("bytecode is not valid hex")
}

fn load_manifest(path: &PathBuf) -> Result<Manifest> {
    Manifest::load(path).with_context(|| format!("loading manifest {}", path.display()))
}

/// Predict through the same ledger checks staging applies.
fn predict_with(
    config: &ProtocolConfig,
    deployer: Option<Address>,
    namespace: Option<&str>,
    code: &[u8],
) -> Result<Prediction> {
    let addresser = ContentAddresser::with_label(
        deployer.unwrap_or(config.deployer),
        namespace.unwrap_or(&config.namespace),
    );
    let ledger = StagingLedger::new(addresser).with_max_code_size(config.max_code_size);
    Ok(ledger.predict(code)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    init_logging("warn")?;
    let cli = Cli::parse();
    let config = ProtocolConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Selector { signature } => {
            println!("{}", Selector::from_signature(&signature));
        }
        Commands::Predict {
            bytecode,
            deployer,
            namespace,
        } => {
            let code = read_hex(&bytecode)?;
            let prediction = predict_with(&config, deployer, namespace.as_deref(), &code)?;
            info!(address = ?prediction.address, "prediction computed");
            print_json(&prediction)?;
        }
        Commands::Build {
            routes,
            out,
            previous,
        } => {
            let raw = fs::read_to_string(&routes)
                .with_context(|| format!("reading routes {}", routes.display()))?;
            let routes: Vec<Route> = serde_json::from_str(&raw)?;
            let previous_hash = match previous {
                Some(path) => Some(load_manifest(&path)?.manifest_hash()?),
                None => None,
            };
            let header = ManifestHeader::new(config.deployer, config.chain_id, previous_hash);
            let manifest = Manifest::build(header, routes)?;
            manifest.save(&out)?;
            println!("{:?}", manifest.root);
        }
        Commands::Root { manifest } => {
            let manifest = load_manifest(&manifest)?;
            let tree = manifest.tree()?;
            print_json(&RootReport {
                root: format!("{:?}", tree.root()),
                leaf_count: tree.leaf_count(),
                depth: tree.depth(),
                manifest_hash: format!("{:?}", manifest.manifest_hash()?),
            })?;
        }
        Commands::VerifyManifest { manifest, previous } => {
            let manifest = load_manifest(&manifest)?;
            if let Err(err) = manifest.verify_root() {
                error!("manifest root check failed: {}", err);
                bail!(err);
            }
            if let Some(path) = previous {
                manifest.verify_previous(&load_manifest(&path)?)?;
            }
            println!("Manifest valid: root {:?}", manifest.root);
        }
        Commands::Proof { manifest, selector } => {
            let manifest = load_manifest(&manifest)?;
            let proof = manifest
                .verify_root()?
                .proof_for_selector(selector)?;
            print_json(&proof)?;
        }
        Commands::Hash { data } => {
            let digest = keccak256(read_hex(&data)?);
            println!("{:?}", digest);
        }
    }

    Ok(())
}
