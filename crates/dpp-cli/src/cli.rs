use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dpp",
    about = "Anchor and verify digital product passports on a ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file (defaults to a local anchoring gateway)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a ledger signing key
    Keygen,
    /// Compute hashes locally without touching the ledger
    #[command(subcommand)]
    Hash(HashCommand),
    /// Anchor a record's master, version and dynamic hashes
    Anchor(AnchorArgs),
    /// Read anchored hashes from the ledger
    #[command(subcommand)]
    Get(GetCommand),
    /// Verify a record or claim against the ledger
    #[command(subcommand)]
    Verify(VerifyCommand),
}

#[derive(Subcommand)]
pub enum HashCommand {
    /// Master hash of a record's current state
    Master { record: PathBuf },
    /// Hash of one version (latest by default)
    Version {
        record: PathBuf,
        #[arg(short = 'n', long = "number")]
        version: Option<u64>,
    },
    /// Dynamic hash over a master hash and ordered version hashes
    Dynamic(DynamicArgs),
}

#[derive(Args)]
pub struct DynamicArgs {
    #[arg(long)]
    pub master: String,
    /// Version hashes in ledger order
    #[arg(long = "version-hash")]
    pub versions: Vec<String>,
    /// Unix seconds; only used by the with-timestamp scheme
    #[arg(long, default_value = "0")]
    pub timestamp: u64,
}

#[derive(Args)]
pub struct AnchorArgs {
    /// Record JSON file
    pub record: PathBuf,
    /// Anchor the latest version of an updated record instead of version 1
    #[arg(long)]
    pub new_version: bool,
    /// Write the record with its anchored hashes to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum GetCommand {
    Master { id: String },
    Version { id: String, version: u64 },
    Versions { id: String },
    Dynamic { id: String },
}

#[derive(Subcommand)]
pub enum VerifyCommand {
    /// Verify the master hash of a record file
    Master {
        record: PathBuf,
        /// Claimed hash (defaults to the record's masterHash)
        #[arg(long)]
        claim: Option<String>,
    },
    /// Verify one version of a record file
    Version {
        record: PathBuf,
        version: u64,
        /// Claimed hash (defaults to that version's versionHash)
        #[arg(long)]
        claim: Option<String>,
    },
    /// Verify the dynamic hash of a record id against the ledger's own entries
    Dynamic {
        id: String,
        #[arg(long)]
        claim: String,
    },
}
