use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            max_attempts: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub api_base_url: String,
    pub catalog_path: PathBuf,
    pub subject_id: u64,
    pub subject_name: String,
    pub language: String,
    pub poll: PollConfig,
    pub pause_between_records_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.sudandigitalarchive.com/sda-api/api/v1".to_string(),
            catalog_path: PathBuf::from("reports.csv"),
            subject_id: 37,
            subject_name: "Yale Humanitarian Research Lab".to_string(),
            language: "english".to_string(),
            poll: PollConfig::default(),
            pause_between_records_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialIngestConfig {
    api_base_url: Option<String>,
    catalog_path: Option<PathBuf>,
    subject_id: Option<u64>,
    subject_name: Option<String>,
    language: Option<String>,
    poll: Option<PollConfig>,
    pause_between_records_ms: Option<u64>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u32(var: &str, fallback: u32) -> u32 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u32>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_path(var: &str, fallback: &PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback.clone(),
    }
}

fn validate(cfg: &IngestConfig) -> Result<()> {
    if cfg.api_base_url.trim().is_empty() {
        return Err(anyhow!("invalid api base url: cannot be empty"));
    }
    if cfg.catalog_path.as_os_str().is_empty() {
        return Err(anyhow!("invalid catalog path: cannot be empty"));
    }
    if cfg.language != "english" && cfg.language != "arabic" {
        return Err(anyhow!(
            "invalid metadata language: use `english` or `arabic`"
        ));
    }
    if cfg.subject_id == 0 {
        return Err(anyhow!("invalid subject id: must be >= 1"));
    }
    if cfg.poll.interval_secs == 0 {
        return Err(anyhow!("invalid poll interval: must be >= 1 second"));
    }
    if cfg.poll.max_attempts == 0 {
        return Err(anyhow!("invalid poll attempt budget: must be >= 1"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("SDA_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".config/sda-ingest/config.toml"))
}

fn merge_file_config(base: &mut IngestConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialIngestConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse ingest config {}: {err}", path.display()))?;
    if let Some(api_base_url) = parsed.api_base_url {
        base.api_base_url = api_base_url;
    }
    if let Some(catalog_path) = parsed.catalog_path {
        base.catalog_path = catalog_path;
    }
    if let Some(subject_id) = parsed.subject_id {
        base.subject_id = subject_id;
    }
    if let Some(subject_name) = parsed.subject_name {
        base.subject_name = subject_name;
    }
    if let Some(language) = parsed.language {
        base.language = language;
    }
    if let Some(poll) = parsed.poll {
        base.poll = poll;
    }
    if let Some(pause) = parsed.pause_between_records_ms {
        base.pause_between_records_ms = pause;
    }
    Ok(())
}

pub fn load_config() -> Result<IngestConfig> {
    let mut cfg = IngestConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.api_base_url = env_or_string("SDA_API_BASE_URL", &cfg.api_base_url);
    cfg.catalog_path = env_or_path("SDA_CATALOG_PATH", &cfg.catalog_path);
    cfg.subject_id = env_or_u64("SDA_SUBJECT_ID", cfg.subject_id);
    cfg.subject_name = env_or_string("SDA_SUBJECT_NAME", &cfg.subject_name);
    cfg.language = env_or_string("SDA_LANGUAGE", &cfg.language);
    cfg.poll.interval_secs = env_or_u64("SDA_POLL_INTERVAL_SECS", cfg.poll.interval_secs);
    cfg.poll.max_attempts = env_or_u32("SDA_POLL_MAX_ATTEMPTS", cfg.poll.max_attempts);
    cfg.pause_between_records_ms = env_or_u64(
        "SDA_PAUSE_BETWEEN_RECORDS_MS",
        cfg.pause_between_records_ms,
    );

    cfg.api_base_url = cfg.api_base_url.trim_end_matches('/').to_string();

    validate(&cfg)?;
    Ok(cfg)
}

/// The API credential is read once at startup and threaded through
/// constructors; nothing below the command layer touches the environment.
pub fn api_key_from_env() -> Result<String> {
    match env::var("SDA_API_KEY") {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(anyhow!(
            "SDA_API_KEY is required; set it in the environment or a .env file"
        )),
    }
}
