use anyhow::Result;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::commands::CommandReport;
use crate::sda::catalog::Catalog;
use crate::sda::client::{Archive, ArchiveClient};
use crate::sda::config::{api_key_from_env, load_config};

#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub catalog: Option<PathBuf>,
}

/// Read-only reconciliation report: which catalogued URLs does the archive
/// already hold? Makes no writes, local or remote.
pub fn run(opts: &CheckOptions) -> Result<CommandReport> {
    let cfg = load_config()?;
    let catalog_path = opts.catalog.clone().unwrap_or(cfg.catalog_path.clone());
    let mut report = CommandReport::new("check");

    report.detail(format!("catalog={}", catalog_path.display()));

    let catalog = Catalog::open(&catalog_path)?;
    let records = catalog.load()?;

    let api_key = api_key_from_env()?;
    let client = ArchiveClient::new(&cfg.api_base_url, &api_key)?;

    let mut found = 0usize;
    let mut missing = 0usize;
    let mut unknown = 0usize;

    for (i, record) in records.iter().enumerate() {
        match client.exists(&record.url) {
            Ok(true) => {
                println!("[exists] {}", record.url);
                found += 1;
            }
            Ok(false) => {
                println!("[missing] {}", record.url);
                missing += 1;
            }
            Err(err) => {
                println!("[unknown] {}: {err}", record.url);
                unknown += 1;
            }
        }
        if i + 1 < records.len() {
            thread::sleep(Duration::from_millis(cfg.pause_between_records_ms));
        }
    }

    report.detail(format!(
        "checked={} found={found} missing={missing} unknown={unknown}",
        records.len()
    ));
    if unknown > 0 {
        report.issue(format!(
            "{unknown} URL(s) could not be checked; treat them as unknown, not absent"
        ));
    }

    Ok(report)
}
