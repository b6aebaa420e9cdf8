use anyhow::Result;
use std::thread;
use std::time::Duration;

use crate::commands::CommandReport;
use crate::sda::client::ArchiveClient;
use crate::sda::config::{api_key_from_env, load_config};
use crate::sda::subjects::{EnrichStatus, enrich_accession};

#[derive(Debug, Clone)]
pub struct EnrichSubjectsOptions {
    pub subject_id: Option<u64>,
    pub urls: Vec<String>,
}

/// Tags accessions that already exist remotely with the configured subject,
/// via fetch-then-PUT so unrelated metadata is preserved.
pub fn run(opts: &EnrichSubjectsOptions) -> Result<CommandReport> {
    let cfg = load_config()?;
    let subject_id = opts.subject_id.unwrap_or(cfg.subject_id);
    let mut report = CommandReport::new("enrich-subjects");

    report.detail(format!("subject_id={subject_id}"));
    report.detail(format!("urls={}", opts.urls.len()));

    let api_key = api_key_from_env()?;
    let client = ArchiveClient::new(&cfg.api_base_url, &api_key)?;

    for (i, url) in opts.urls.iter().enumerate() {
        match enrich_accession(&client, url, subject_id)? {
            EnrichStatus::AlreadyTagged(id) => {
                report.detail(format!("{url}: accession {id} already tagged"));
            }
            EnrichStatus::Updated(id) => {
                report.detail(format!("{url}: accession {id} updated"));
            }
            EnrichStatus::Missing => {
                report.issue(format!("{url}: no accession with this seed URL"));
            }
            EnrichStatus::Failed(detail) => {
                report.issue(format!("{url}: {detail}"));
            }
        }
        if i + 1 < opts.urls.len() {
            thread::sleep(Duration::from_millis(cfg.pause_between_records_ms));
        }
    }

    Ok(report)
}
