use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;
use crate::commands::CommandReport;
use crate::commands::check::CheckOptions;
use crate::commands::enrich_subjects::EnrichSubjectsOptions;
use crate::commands::ingest::IngestOptions;
use crate::commands::subject_id::SubjectIdOptions;

#[derive(Debug, Parser)]
#[command(
    name = "sda-ingest",
    version,
    about = "Reconciles a scraped report catalog against the archive and ingests missing records idempotently."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Submit every unconfirmed catalog record, confirming each before the next.
    Ingest {
        /// Catalog CSV to reconcile (defaults to the configured path).
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Print the payloads that would be submitted; no network calls.
        #[arg(long)]
        dry_run: bool,
    },
    /// Report which catalogued URLs the archive already holds (read-only).
    Check {
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Add the subject tag to accessions that already exist remotely.
    EnrichSubjects {
        /// Subject id to add (defaults to the configured one).
        #[arg(long)]
        subject_id: Option<u64>,
        /// Seed URLs of the accessions to tag.
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Look up (or create) the configured subject in the archive taxonomy.
    SubjectId {
        #[arg(long)]
        name: Option<String>,
    },
}

fn render(report: &CommandReport) {
    println!(
        "[{}] {}",
        report.command,
        if report.ok { "ok" } else { "failed" }
    );
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        eprintln!("  issue: {issue}");
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let report = match cli.command {
        Commands::Ingest { catalog, dry_run } => {
            commands::ingest::run(&IngestOptions { catalog, dry_run })?
        }
        Commands::Check { catalog } => commands::check::run(&CheckOptions { catalog })?,
        Commands::EnrichSubjects { subject_id, urls } => {
            commands::enrich_subjects::run(&EnrichSubjectsOptions { subject_id, urls })?
        }
        Commands::SubjectId { name } => commands::subject_id::run(&SubjectIdOptions { name })?,
    };

    render(&report);
    if !report.ok {
        anyhow::bail!(
            "{} completed with {} issue(s)",
            report.command,
            report.issues.len()
        );
    }
    Ok(())
}
