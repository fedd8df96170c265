use std::path::Path;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use dpp_crypto::SigningKey;
use dpp_ledger::{HashRecord, LedgerClient, VersionHashRecord, VersionHashes};
use dpp_sdk::{Anchor, AnchorConfig, AnchorSummary};
use dpp_types::{Digest, Passport, RecordId};
use dpp_verify::{IntegrityStatus, VerificationReport, VerifyResult};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    let format = cli.format;
    match cli.command {
        Command::Keygen => cmd_keygen(format),
        Command::Hash(cmd) => cmd_hash(cmd, &load_config(cli.config.as_deref())?, format),
        Command::Anchor(args) => {
            let config = load_config(cli.config.as_deref())?;
            cmd_anchor(args, &config, format).await
        }
        Command::Get(cmd) => {
            let config = load_config(cli.config.as_deref())?;
            cmd_get(cmd, &config, format).await
        }
        Command::Verify(cmd) => {
            let config = load_config(cli.config.as_deref())?;
            cmd_verify(cmd, &config, format).await
        }
    }
}

fn cmd_keygen(format: OutputFormat) -> anyhow::Result<ExitCode> {
    let key = SigningKey::generate();
    match format {
        OutputFormat::Json => print_json(&json!({
            "signingKey": key.to_hex(),
            "publicKey": key.verifying_key().to_hex(),
        }))?,
        OutputFormat::Text => {
            println!("{} Generated ledger signing key", "✓".green().bold());
            println!("  Signing key: {}", key.to_hex().yellow());
            println!("  Public key:  {}", key.verifying_key().to_hex().cyan());
            println!(
                "\nStore the signing key in {} or the config file.",
                dpp_sdk::SIGNING_KEY_ENV.bold()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_hash(
    cmd: HashCommand,
    config: &AnchorConfig,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let hasher = config.hash_engine();
    let (label, hash) = match cmd {
        HashCommand::Master { record } => {
            let record = read_record(&record)?;
            ("master".to_string(), hasher.master_hash_of(&record)?)
        }
        HashCommand::Version { record, version } => {
            let record = read_record(&record)?;
            let number = match version {
                Some(n) => n,
                None => record
                    .latest_version()
                    .map(|v| v.version)
                    .context("record has no versions")?,
            };
            (format!("version {number}"), hasher.version_hash_of(&record, number)?)
        }
        HashCommand::Dynamic(args) => {
            let master = parse_digest(&args.master)?;
            let versions = args
                .versions
                .iter()
                .map(|v| parse_digest(v))
                .collect::<anyhow::Result<Vec<_>>>()?;
            ("dynamic".to_string(), hasher.dynamic_hash(&master, &versions, args.timestamp))
        }
    };
    match format {
        OutputFormat::Json => print_json(&json!({ "class": label, "hash": hash }))?,
        OutputFormat::Text => println!("{} hash: {}", label, hash.to_hex().yellow()),
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_anchor(
    args: AnchorArgs,
    config: &AnchorConfig,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let mut record = read_record(&args.record)?;
    let anchor = connect(config, true).await?;
    let summary = if args.new_version {
        anchor.anchor_new_version(&mut record).await?
    } else {
        anchor.anchor_created(&mut record).await?
    };

    if let Some(out) = &args.output {
        let text = serde_json::to_string_pretty(&record)?;
        std::fs::write(out, text).with_context(|| format!("writing {}", out.display()))?;
    }
    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => print_summary(&summary),
    }
    anchor.close();
    Ok(ExitCode::SUCCESS)
}

async fn cmd_get(
    cmd: GetCommand,
    config: &AnchorConfig,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let anchor = connect(config, false).await?;
    match cmd {
        GetCommand::Master { id } => {
            let record = anchor.get_master_hash(&parse_id(&id)?).await?;
            show_hash_record("master", &record, format)?;
        }
        GetCommand::Dynamic { id } => {
            let record = anchor.get_dynamic_hash(&parse_id(&id)?).await?;
            show_hash_record("dynamic", &record, format)?;
        }
        GetCommand::Version { id, version } => {
            let record = anchor.get_version_hash(&parse_id(&id)?, version).await?;
            show_version_record(&record, format)?;
        }
        GetCommand::Versions { id } => {
            let all = anchor.get_version_hashes(&parse_id(&id)?).await?;
            show_versions(&all, format)?;
        }
    }
    anchor.close();
    Ok(ExitCode::SUCCESS)
}

async fn cmd_verify(
    cmd: VerifyCommand,
    config: &AnchorConfig,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let anchor = connect(config, false).await?;
    let result: VerifyResult<VerificationReport> = match cmd {
        VerifyCommand::Master { record, claim } => {
            let record = read_record(&record)?;
            let claim = match claim {
                Some(c) => parse_digest(&c)?,
                None => record.master_hash.context("record has no masterHash; pass --claim")?,
            };
            anchor.verify_master_hash(&record, claim).await
        }
        VerifyCommand::Version { record, version, claim } => {
            let record = read_record(&record)?;
            let claim = match claim {
                Some(c) => parse_digest(&c)?,
                None => record
                    .version(version)
                    .and_then(|v| v.version_hash)
                    .with_context(|| {
                        format!("version {version} has no versionHash; pass --claim")
                    })?,
            };
            anchor.verify_version_hash(&record, claim, version).await
        }
        VerifyCommand::Dynamic { id, claim } => {
            anchor
                .verify_dynamic_hash(&parse_id(&id)?, parse_digest(&claim)?)
                .await
        }
    };
    anchor.close();

    let status = IntegrityStatus::of(&result);
    match (&result, format) {
        (Ok(report), OutputFormat::Json) => print_json(report)?,
        (Ok(report), OutputFormat::Text) => print_report(report),
        (Err(_), _) => {}
    }
    match status {
        IntegrityStatus::Valid => Ok(ExitCode::SUCCESS),
        IntegrityStatus::Mismatch => Ok(ExitCode::FAILURE),
        IntegrityStatus::Error(e) => bail!("could not determine integrity: {e}"),
    }
}

// ---- Helpers ----

fn load_config(path: Option<&Path>) -> anyhow::Result<AnchorConfig> {
    let config = match path {
        Some(path) => AnchorConfig::load(path)?,
        None => AnchorConfig::default().with_env().validated()?,
    };
    debug!(?config, "configuration loaded");
    Ok(config)
}

/// Reads need no signing key; an ephemeral one identifies the session.
async fn connect(config: &AnchorConfig, writes: bool) -> anyhow::Result<Anchor> {
    let contract = config.contract()?;
    let signer = match config.signing_key() {
        Ok(key) => key,
        Err(e) if writes => return Err(e.into()),
        Err(_) => SigningKey::generate(),
    };
    let client = LedgerClient::connect(
        &config.ledger.endpoint,
        config.request_timeout(),
        signer,
        contract,
        config.confirmation_policy(),
    )
    .await
    .with_context(|| format!("connecting to {}", config.ledger.endpoint))?;
    Ok(Anchor::new(Arc::new(client), config.hash_engine()))
}

fn read_record(path: &Path) -> anyhow::Result<Passport> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let record: Passport =
        serde_json::from_str(&text).with_context(|| format!("parsing record {}", path.display()))?;
    record.check_history()?;
    Ok(record)
}

fn parse_id(s: &str) -> anyhow::Result<RecordId> {
    RecordId::parse(s).with_context(|| format!("invalid record id {s:?}"))
}

fn parse_digest(s: &str) -> anyhow::Result<Digest> {
    Digest::from_str(s).with_context(|| format!("invalid hash {s:?}"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_summary(summary: &AnchorSummary) {
    println!("{} Anchored record {}", "✓".green().bold(), summary.record.to_string().cyan());
    println!("  Master:    {}", summary.master_hash.to_hex().yellow());
    println!("  Version {}: {}", summary.version, summary.version_hash.to_hex().yellow());
    println!("  Dynamic:   {}", summary.dynamic_hash.to_hex().yellow());
}

fn print_report(report: &VerificationReport) {
    if report.is_valid() {
        println!("{} {}", "✓".green().bold(), report);
    } else {
        println!("{} {}", "✗".red().bold(), report.to_string().red());
    }
    println!("  Computed: {}", report.computed.to_hex());
    println!("  On-chain: {}", report.on_chain.to_hex());
    println!("  Claimed:  {}", report.claimed.to_hex());
}

fn show_hash_record(class: &str, record: &HashRecord, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(record)?,
        OutputFormat::Text => {
            println!("{} hash: {}", class, record.hash.to_hex().yellow());
            println!("  Timestamp: {}", record.timestamp);
        }
    }
    Ok(())
}

fn show_version_record(record: &VersionHashRecord, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(record)?,
        OutputFormat::Text => {
            println!("version {} hash: {}", record.version, record.hash.to_hex().yellow());
            println!("  Timestamp: {}", record.timestamp);
        }
    }
    Ok(())
}

fn show_versions(all: &VersionHashes, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(all)?,
        OutputFormat::Text => {
            for v in all.iter() {
                println!(
                    "{}  {}  {}",
                    format!("v{}", v.version).bold(),
                    v.hash.to_hex().yellow(),
                    v.timestamp
                );
            }
        }
    }
    Ok(())
}
