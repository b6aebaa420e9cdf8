use anyhow::Result;

use crate::commands::CommandReport;
use crate::sda::client::ArchiveClient;
use crate::sda::config::{api_key_from_env, load_config};
use crate::sda::subjects::resolve_subject_id;

#[derive(Debug, Clone, Default)]
pub struct SubjectIdOptions {
    pub name: Option<String>,
}

/// Resolves the subject tag used on submissions, creating the taxonomy entry
/// when it does not exist yet.
pub fn run(opts: &SubjectIdOptions) -> Result<CommandReport> {
    let cfg = load_config()?;
    let name = opts.name.clone().unwrap_or(cfg.subject_name.clone());
    let mut report = CommandReport::new("subject-id");

    report.detail(format!("subject_name={name}"));
    report.detail(format!("lang={}", cfg.language));

    let api_key = api_key_from_env()?;
    let client = ArchiveClient::new(&cfg.api_base_url, &api_key)?;

    let id = resolve_subject_id(&client, &name, &cfg.language)?;
    report.detail(format!("subject_id={id}"));
    println!("{id}");

    Ok(report)
}
