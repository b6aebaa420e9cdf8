use crate::error::ArchiveError;
use crate::sda::client::{Accession, AccessionPayload, Archive, ArchiveClient};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichStatus {
    /// The accession already carries the subject tag.
    AlreadyTagged(u64),
    /// The accession was rewritten with the subject added.
    Updated(u64),
    /// No accession matches the URL exactly.
    Missing,
    /// The archive rejected the update or could not be reached.
    Failed(String),
}

/// Looks the subject up in the archive's taxonomy, creating it when absent.
pub fn resolve_subject_id(
    client: &ArchiveClient,
    name: &str,
    lang: &str,
) -> Result<u64, ArchiveError> {
    if let Some(found) = client.find_subject(name, lang)? {
        return Ok(found.id);
    }
    let created = client.create_subject(name, lang)?;
    Ok(created.id)
}

/// Read-modify-write payload for a PUT: current field values are carried
/// over so the update does not clobber unrelated metadata.
fn enrichment_payload(accession: &Accession, subject_id: u64) -> AccessionPayload {
    let english = accession.has_english_metadata.unwrap_or(true);

    let mut subjects: BTreeSet<u64> = accession
        .subjects_en_ids
        .clone()
        .unwrap_or_default()
        .into_iter()
        .collect();
    subjects.insert(subject_id);

    let title = if english {
        accession.title_en.clone()
    } else {
        accession.title_ar.clone()
    };
    let description = if english {
        accession.description_en.clone()
    } else {
        accession.description_ar.clone()
    };

    AccessionPayload {
        url: accession.seed_url.clone(),
        metadata_title: title
            .or_else(|| accession.title_ar.clone())
            .unwrap_or_default(),
        metadata_description: description
            .or_else(|| accession.description_ar.clone())
            .unwrap_or_default(),
        metadata_time: accession.dublin_metadata_date.clone(),
        metadata_language: if english { "english" } else { "arabic" }.to_string(),
        metadata_format: "wacz".to_string(),
        metadata_subjects: subjects.into_iter().collect(),
        is_private: accession.is_private.unwrap_or(false),
    }
}

/// Adds the subject tag to an accession that already exists remotely.
/// Per-URL failures come back as a status so a batch can keep going.
pub fn enrich_accession(
    archive: &dyn Archive,
    url: &str,
    subject_id: u64,
) -> Result<EnrichStatus, ArchiveError> {
    let accession = match archive.find_by_url(url) {
        Ok(Some(accession)) => accession,
        Ok(None) => return Ok(EnrichStatus::Missing),
        Err(ArchiveError::RemoteUnavailable(detail)) => return Ok(EnrichStatus::Failed(detail)),
        Err(err) => return Err(err),
    };

    let already = accession
        .subjects_en_ids
        .as_deref()
        .is_some_and(|ids| ids.contains(&subject_id));
    if already {
        return Ok(EnrichStatus::AlreadyTagged(accession.id));
    }

    let payload = enrichment_payload(&accession, subject_id);
    match archive.update(accession.id, &payload) {
        Ok(updated) => Ok(EnrichStatus::Updated(updated.id)),
        Err(
            err @ (ArchiveError::SubmitRejected { .. } | ArchiveError::RemoteUnavailable(_)),
        ) => Ok(EnrichStatus::Failed(err.to_string())),
        Err(err) => Err(err),
    }
}
