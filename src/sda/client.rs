use crate::error::ArchiveError;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const API_KEY_HEADER: &str = "x-api-key";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// An accession as the archive reports it. Matched to a catalog record by
/// `seed_url`; everything else is metadata we must preserve on update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Accession {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub seed_url: String,
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub title_ar: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub description_ar: Option<String>,
    #[serde(default)]
    pub dublin_metadata_date: Option<String>,
    #[serde(default)]
    pub subjects_en_ids: Option<Vec<u64>>,
    #[serde(default)]
    pub has_english_metadata: Option<bool>,
    #[serde(default)]
    pub is_private: Option<bool>,
}

/// Request body shared by create (POST) and update (PUT, full replace).
#[derive(Debug, Clone, Serialize)]
pub struct AccessionPayload {
    pub url: String,
    pub metadata_title: String,
    pub metadata_description: String,
    pub metadata_time: Option<String>,
    pub metadata_language: String,
    pub metadata_format: String,
    pub metadata_subjects: Vec<u64>,
    pub is_private: bool,
}

/// Seam between the controller/poller and the remote archive, so the
/// reconciliation logic can be exercised against in-memory stubs.
pub trait Archive {
    fn exists(&self, url: &str) -> Result<bool, ArchiveError>;
    fn find_by_url(&self, url: &str) -> Result<Option<Accession>, ArchiveError>;
    fn create(&self, payload: &AccessionPayload) -> Result<Accession, ArchiveError>;
    fn update(&self, id: u64, payload: &AccessionPayload) -> Result<Accession, ArchiveError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subject {
    pub id: u64,
    #[serde(default)]
    pub subject: String,
}

pub struct ArchiveClient {
    http: Client,
    base_url: String,
    api_key: String,
}

fn unreachable_err(detail: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::RemoteUnavailable(detail.to_string())
}

/// The listing endpoint answers either a bare array or `{ "items": [...] }`.
fn parse_listing(body: &Value) -> Vec<Accession> {
    let items = body
        .as_array()
        .cloned()
        .or_else(|| body.get("items").and_then(Value::as_array).cloned())
        .unwrap_or_default();

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

fn exact_match(items: Vec<Accession>, url: &str) -> Option<Accession> {
    items.into_iter().find(|item| item.seed_url == url)
}

impl ArchiveClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ArchiveError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(unreachable_err)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn accessions_url(&self) -> String {
        format!("{}/accessions", self.base_url)
    }

    fn subjects_url(&self) -> String {
        format!("{}/metadata-subjects", self.base_url)
    }

    /// Searches the subject taxonomy for an exact name match.
    pub fn find_subject(&self, name: &str, lang: &str) -> Result<Option<Subject>, ArchiveError> {
        let response = self
            .http
            .get(self.subjects_url())
            .query(&[("query_term", name), ("lang", lang)])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .map_err(unreachable_err)?;
        if !response.status().is_success() {
            return Err(unreachable_err(format!(
                "subject search failed with status {}",
                response.status()
            )));
        }
        let body: Value = response.json().map_err(unreachable_err)?;
        let items = body
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let found = items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<Subject>(item).ok())
            .find(|item| item.subject == name);
        Ok(found)
    }

    pub fn create_subject(&self, name: &str, lang: &str) -> Result<Subject, ArchiveError> {
        let payload = serde_json::json!({
            "metadata_subject": name,
            "lang": lang,
        });
        let response = self
            .http
            .post(self.subjects_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .map_err(unreachable_err)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ArchiveError::SubmitRejected {
                status: status.as_u16(),
                body,
            });
        }
        response.json().map_err(unreachable_err)
    }
}

impl Archive for ArchiveClient {
    /// True iff at least one remote item matches the URL exactly. The
    /// `url_filter` parameter may be fuzzy server-side, so the result set is
    /// post-filtered for string equality on `seed_url` before concluding
    /// existence.
    fn exists(&self, url: &str) -> Result<bool, ArchiveError> {
        Ok(self.find_by_url(url)?.is_some())
    }

    fn find_by_url(&self, url: &str) -> Result<Option<Accession>, ArchiveError> {
        let response = self
            .http
            .get(self.accessions_url())
            .query(&[("url_filter", url)])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .map_err(unreachable_err)?;
        if !response.status().is_success() {
            return Err(unreachable_err(format!(
                "existence query failed with status {}",
                response.status()
            )));
        }
        let body: Value = response.json().map_err(unreachable_err)?;
        Ok(exact_match(parse_listing(&body), url))
    }

    fn create(&self, payload: &AccessionPayload) -> Result<Accession, ArchiveError> {
        let response = self
            .http
            .post(self.accessions_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(payload)
            .send()
            .map_err(unreachable_err)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ArchiveError::SubmitRejected {
                status: status.as_u16(),
                body,
            });
        }
        response.json().map_err(unreachable_err)
    }

    fn update(&self, id: u64, payload: &AccessionPayload) -> Result<Accession, ArchiveError> {
        let response = self
            .http
            .put(format!("{}/{id}", self.accessions_url()))
            .header(API_KEY_HEADER, &self.api_key)
            .json(payload)
            .send()
            .map_err(unreachable_err)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ArchiveError::SubmitRejected {
                status: status.as_u16(),
                body,
            });
        }
        response.json().map_err(unreachable_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_listing_accepts_bare_array() {
        let body = json!([
            {"id": 1, "seed_url": "https://x/doc1"},
            {"id": 2, "seed_url": "https://x/doc2"}
        ]);
        let items = parse_listing(&body);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].seed_url, "https://x/doc2");
    }

    #[test]
    fn parse_listing_accepts_items_envelope() {
        let body = json!({"items": [{"id": 7, "seed_url": "https://x/doc7"}], "total": 1});
        let items = parse_listing(&body);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 7);
    }

    #[test]
    fn parse_listing_tolerates_unknown_shapes() {
        assert!(parse_listing(&json!({"detail": "no results"})).is_empty());
        assert!(parse_listing(&json!(null)).is_empty());
    }

    #[test]
    fn exact_match_ignores_fuzzy_filter_hits() {
        let items = vec![
            Accession {
                id: 1,
                seed_url: "https://x/doc1-annex".to_string(),
                ..Accession::default()
            },
            Accession {
                id: 2,
                seed_url: "https://x/doc1".to_string(),
                ..Accession::default()
            },
        ];
        let found = exact_match(items, "https://x/doc1").expect("match");
        assert_eq!(found.id, 2);
    }

    #[test]
    fn exact_match_rejects_prefix_only_hits() {
        let items = vec![Accession {
            id: 1,
            seed_url: "https://x/doc10".to_string(),
            ..Accession::default()
        }];
        assert!(exact_match(items, "https://x/doc1").is_none());
    }
}
