use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use crate::commands::CommandReport;
use crate::sda::audit::{append_event, audit_log_path};
use crate::sda::catalog::{Catalog, CatalogRecord, is_iso_date};
use crate::sda::client::ArchiveClient;
use crate::sda::config::{IngestConfig, api_key_from_env, load_config};
use crate::sda::controller::{IngestionController, RecordOutcome};
use crate::sda::poll::ConfirmationPoller;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub catalog: Option<PathBuf>,
    pub dry_run: bool,
}

pub fn run(opts: &IngestOptions) -> Result<CommandReport> {
    let cfg = load_config()?;
    let catalog_path = opts.catalog.clone().unwrap_or(cfg.catalog_path.clone());
    let mut report = CommandReport::new("ingest");

    report.detail(format!("catalog={}", catalog_path.display()));
    report.detail(format!("api_base_url={}", cfg.api_base_url));

    let catalog = Catalog::open(&catalog_path)?;
    let records = catalog.load()?;
    report.detail(format!("records={}", records.len()));

    for record in &records {
        if !record.ingested && !record.date.trim().is_empty() && !is_iso_date(&record.date) {
            report.detail(format!(
                "warning: {} has non ISO-8601 date `{}`",
                record.url, record.date
            ));
        }
    }

    if opts.dry_run {
        return dry_run(report, &cfg, &records);
    }

    let api_key = api_key_from_env()?;
    let client = ArchiveClient::new(&cfg.api_base_url, &api_key)?;
    let poller = ConfirmationPoller::new(
        Duration::from_secs(cfg.poll.interval_secs),
        cfg.poll.max_attempts,
    );
    let controller = IngestionController::new(
        &client,
        &catalog,
        poller,
        vec![cfg.subject_id],
        cfg.language.clone(),
        Duration::from_millis(cfg.pause_between_records_ms),
    );

    let audit_log = audit_log_path(&catalog_path);
    let summary = controller.run(&records, |record, outcome| {
        let message = match outcome {
            RecordOutcome::Confirmed { attempts } => {
                format!("{} (visible after {attempts} probe(s))", record.url)
            }
            RecordOutcome::SubmitFailed(detail) | RecordOutcome::CheckFailed(detail) => {
                format!("{}: {detail}", record.url)
            }
            _ => record.url.clone(),
        };
        if let Err(err) = append_event(&audit_log, "ingest", outcome.label(), &message) {
            eprintln!("warning: audit log write failed: {err:#}");
        }
        println!("[{}] {message}", outcome.label());
    })?;

    report.detail(format!(
        "processed={} local_skips={} remote_skips={} confirmed={} timed_out={} submit_failures={} check_failures={}",
        summary.processed,
        summary.local_skips,
        summary.remote_skips,
        summary.confirmed,
        summary.timed_out,
        summary.submit_failures,
        summary.check_failures,
    ));
    report.detail(format!("audit_log={}", audit_log.display()));

    if summary.unresolved() > 0 {
        report.issue(format!(
            "{} record(s) unresolved; re-run the pipeline to retry them",
            summary.unresolved()
        ));
    }

    Ok(report)
}

/// Prints the payload each pending record would submit, without touching the
/// network. Useful for inspecting the batch before a real run.
fn dry_run(
    mut report: CommandReport,
    cfg: &IngestConfig,
    records: &[CatalogRecord],
) -> Result<CommandReport> {
    let mut pending = 0usize;
    let mut skipped = 0usize;

    for record in records {
        if record.ingested {
            skipped += 1;
            continue;
        }
        pending += 1;
        let payload = serde_json::json!({
            "url": record.url,
            "metadata_title": record.title,
            "metadata_description": record.description,
            "metadata_time": record.date,
            "metadata_language": cfg.language,
            "metadata_format": "wacz",
            "metadata_subjects": [cfg.subject_id],
            "is_private": false,
        });
        println!("[dry-run] POST {}/accessions", cfg.api_base_url);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    }

    report.detail(format!("dry-run: would_submit={pending} local_skips={skipped}"));
    Ok(report)
}
