//! CLM attestation command line.
//!
//! `plan` prints the submission order, content digests and root aggregate
//! without touching any ledger; `attest` rehearses the full write path
//! against an in-process ledger and writes a results snapshot; `verify`
//! audits the hosted record set against the expected document structure.
//! Live chain submission requires an external signer and is out of scope
//! for this binary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clm_core::{
    active_config, aggregate_root, content_digest, Document, EasScanLedger, IntegrityReport,
    IntegrityVerifier, MemoryLedger, RecordSubmitter, SubmitterConfig,
};

#[derive(Parser, Debug)]
#[command(name = "clm")]
#[command(about = "Attestation tooling for the Core Logic Module")]
#[command(version)]
struct Cli {
    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "CLM_LOG", default_value = "info")]
    log_level: String,

    /// Document description file; defaults to the built-in CLM v1.0
    #[arg(long, global = true)]
    document: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the submission plan: order, digests, simulated uids, root
    Plan,
    /// Rehearse the full write path against an in-process ledger
    Attest {
        /// Where to write the results snapshot
        #[arg(long, default_value = "clm-attestations.json")]
        output: PathBuf,
        /// Delay between records, in milliseconds
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
    /// Fetch the hosted record set and run the integrity verifier
    Verify {
        /// Deployment descriptor overriding chain and schema uid
        #[arg(long, default_value = "clm-deployment.json")]
        deployment: PathBuf,
    },
}

fn load_document(path: &Option<PathBuf>) -> anyhow::Result<Document> {
    match path {
        Some(path) => Document::from_path(path)
            .with_context(|| format!("loading document {}", path.display())),
        None => Ok(Document::builtin()),
    }
}

fn plan(document: &Document) -> anyhow::Result<()> {
    let graph = document.graph()?;
    let sequence = graph.sequence();

    println!("Attestation order (parents first):");
    for (index, section) in sequence.iter().enumerate() {
        let parent_info = match &section.parent {
            Some(parent) => format!(" (parent: {parent})"),
            None => " (root)".to_string(),
        };
        println!("  {}. {}: {}{}", index + 1, section.id, section.title, parent_info);
    }

    println!("\nContent digests:");
    let mut digests = Vec::with_capacity(sequence.len());
    for section in &sequence {
        let digest = content_digest(section.content.as_deref());
        digests.push(digest);
        println!("  {}: {}", section.id, digest);
    }

    println!("\nSimulated uid assignment:");
    for (index, section) in sequence.iter().enumerate() {
        println!("  {}: uid=0x{:064x}", section.id, index);
    }

    println!("\nRoot aggregate: {}", aggregate_root(&digests));
    Ok(())
}

async fn attest(
    document: &Document,
    output: &PathBuf,
    delay_ms: u64,
) -> anyhow::Result<()> {
    let graph = document.graph()?;
    let ledger = MemoryLedger::new();
    let config = SubmitterConfig {
        record_delay: Duration::from_millis(delay_ms),
        ..SubmitterConfig::default()
    };

    let report = RecordSubmitter::new(&ledger, config)
        .submit_graph(&graph)
        .await?;
    info!(records = report.records.len(), root = %report.root, "Rehearsal submission complete");

    // Round-trip audit of what the ledger now holds.
    let audit = IntegrityVerifier::for_document(document)
        .verify(&ledger)
        .await?;
    if !audit.is_clean() {
        print_report(&audit);
        bail!("rehearsal record set failed integrity verification");
    }

    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(output, json)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("Attested {} sections (rehearsal)", report.records.len());
    println!("Root aggregate: {}", report.root);
    println!("Results saved to {}", output.display());
    Ok(())
}

async fn verify(document: &Document, deployment: &PathBuf) -> anyhow::Result<()> {
    let config = active_config(deployment);
    let Some(schema_uid) = config.schema_uid else {
        bail!("no schema uid deployed for chain {}", config.chain_id);
    };
    info!(chain_id = config.chain_id, schema = %schema_uid, "Fetching record set");

    let ledger = EasScanLedger::new(config.graphql, schema_uid);
    let report = IntegrityVerifier::for_document(document)
        .verify(&ledger)
        .await?;

    print_report(&report);
    if report.is_clean() {
        Ok(())
    } else {
        bail!(
            "{} violations, {} undecodable records",
            report.violations.len(),
            report.decode_failures.len()
        );
    }
}

fn print_report(report: &IntegrityReport) {
    println!(
        "Checked {} records, {} roots observed",
        report.records_checked,
        report.observed_roots.len()
    );
    for violation in &report.violations {
        println!(
            "  ✗ [{}] {}: expected {}, got {}",
            violation.rule.as_str(),
            violation.section_id,
            violation.expected,
            violation.actual
        );
    }
    for failure in &report.decode_failures {
        println!("  ✗ [undecodable] {}: {}", failure.uid, failure.reason);
    }
    if report.is_clean() {
        println!("  ✓ Record set is clean");
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("clm_cli={0},clm_core={0},info", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let result = async {
        let document = load_document(&cli.document)?;
        match &cli.command {
            Command::Plan => plan(&document),
            Command::Attest { output, delay_ms } => attest(&document, output, *delay_ms).await,
            Command::Verify { deployment } => verify(&document, deployment).await,
        }
    }
    .await;

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["clm", "plan"]).unwrap();
        assert!(matches!(cli.command, Command::Plan));

        let cli = Cli::try_parse_from(["clm", "attest", "--delay-ms", "5"]).unwrap();
        assert!(matches!(cli.command, Command::Attest { delay_ms: 5, .. }));

        let cli =
            Cli::try_parse_from(["clm", "verify", "--deployment", "custom.json"]).unwrap();
        assert!(matches!(cli.command, Command::Verify { .. }));
    }
}
