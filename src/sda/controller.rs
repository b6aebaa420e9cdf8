use crate::error::ArchiveError;
use crate::sda::catalog::{Catalog, CatalogRecord};
use crate::sda::client::{AccessionPayload, Archive};
use crate::sda::poll::{ConfirmationPoller, PollOutcome};
use std::thread;
use std::time::Duration;

/// Terminal state of one record for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Local flag already set; no network call was made.
    LocalSkip,
    /// The archive already holds the record; flag set without submitting.
    RemoteSkip,
    /// Submitted and confirmed visible after the given number of probes.
    Confirmed { attempts: u32 },
    /// Submitted, but not visible within the poll budget. Flag stays False;
    /// the next run re-checks remote existence before re-submitting.
    TimedOut,
    /// The archive rejected or never received the submission. Flag stays
    /// False and no poll is attempted.
    SubmitFailed(String),
    /// Existence could not be determined ("unknown", not "absent").
    /// Local state is left untouched.
    CheckFailed(String),
}

impl RecordOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RecordOutcome::LocalSkip => "local_skip",
            RecordOutcome::RemoteSkip => "remote_skip",
            RecordOutcome::Confirmed { .. } => "confirmed",
            RecordOutcome::TimedOut => "timed_out",
            RecordOutcome::SubmitFailed(_) => "submit_failed",
            RecordOutcome::CheckFailed(_) => "check_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub local_skips: usize,
    pub remote_skips: usize,
    pub confirmed: usize,
    pub timed_out: usize,
    pub submit_failures: usize,
    pub check_failures: usize,
}

impl RunSummary {
    pub fn unresolved(&self) -> usize {
        self.timed_out + self.submit_failures + self.check_failures
    }

    fn count(&mut self, outcome: &RecordOutcome) {
        self.processed += 1;
        match outcome {
            RecordOutcome::LocalSkip => self.local_skips += 1,
            RecordOutcome::RemoteSkip => self.remote_skips += 1,
            RecordOutcome::Confirmed { .. } => self.confirmed += 1,
            RecordOutcome::TimedOut => self.timed_out += 1,
            RecordOutcome::SubmitFailed(_) => self.submit_failures += 1,
            RecordOutcome::CheckFailed(_) => self.check_failures += 1,
        }
    }
}

/// Drives the per-record reconciliation state machine:
/// local-flag check -> remote existence check -> submit -> confirm -> flag.
///
/// Records are processed strictly sequentially, each resolved through
/// confirmation or timeout before the next begins, so at most one
/// unconfirmed submission is ever in flight against the archive.
pub struct IngestionController<'a> {
    archive: &'a dyn Archive,
    catalog: &'a Catalog,
    poller: ConfirmationPoller,
    subjects: Vec<u64>,
    language: String,
    pause_between_records: Duration,
}

impl<'a> IngestionController<'a> {
    pub fn new(
        archive: &'a dyn Archive,
        catalog: &'a Catalog,
        poller: ConfirmationPoller,
        subjects: Vec<u64>,
        language: String,
        pause_between_records: Duration,
    ) -> Self {
        Self {
            archive,
            catalog,
            poller,
            subjects,
            language,
            pause_between_records,
        }
    }

    pub fn payload_for(&self, record: &CatalogRecord) -> AccessionPayload {
        AccessionPayload {
            url: record.url.clone(),
            metadata_title: record.title.clone(),
            metadata_description: record.description.clone(),
            metadata_time: if record.date.trim().is_empty() {
                None
            } else {
                Some(record.date.trim().to_string())
            },
            metadata_language: self.language.clone(),
            metadata_format: "wacz".to_string(),
            metadata_subjects: self.subjects.clone(),
            is_private: false,
        }
    }

    /// Resolves one record. Per-record failures come back as outcomes;
    /// only catalog failures propagate as errors and abort the run.
    pub fn process_record(&self, record: &CatalogRecord) -> Result<RecordOutcome, ArchiveError> {
        if record.ingested {
            return Ok(RecordOutcome::LocalSkip);
        }

        match self.archive.exists(&record.url) {
            Ok(true) => {
                self.catalog.mark_ingested(&record.url)?;
                return Ok(RecordOutcome::RemoteSkip);
            }
            Ok(false) => {}
            Err(ArchiveError::RemoteUnavailable(detail)) => {
                return Ok(RecordOutcome::CheckFailed(detail));
            }
            Err(err) => return Err(err),
        }

        // No within-run submit retry: the operator re-invokes the pipeline
        // and the existence check above keeps the re-attempt duplicate-free.
        if let Err(err) = self.archive.create(&self.payload_for(record)) {
            return match err {
                ArchiveError::SubmitRejected { .. } | ArchiveError::RemoteUnavailable(_) => {
                    Ok(RecordOutcome::SubmitFailed(err.to_string()))
                }
                other => Err(other),
            };
        }

        match self.poller.wait_for(self.archive, &record.url) {
            PollOutcome::Confirmed { attempts } => {
                self.catalog.mark_ingested(&record.url)?;
                Ok(RecordOutcome::Confirmed { attempts })
            }
            PollOutcome::TimedOut => Ok(RecordOutcome::TimedOut),
        }
    }

    /// Processes the whole batch in input order, invoking `on_outcome` after
    /// each record resolves. A short fixed pause between records that hit
    /// the network is the only rate limiting toward the archive.
    pub fn run(
        &self,
        records: &[CatalogRecord],
        mut on_outcome: impl FnMut(&CatalogRecord, &RecordOutcome),
    ) -> Result<RunSummary, ArchiveError> {
        let mut summary = RunSummary::default();
        for (i, record) in records.iter().enumerate() {
            let outcome = self.process_record(record)?;
            summary.count(&outcome);
            on_outcome(record, &outcome);

            let touched_network = outcome != RecordOutcome::LocalSkip;
            if touched_network && i + 1 < records.len() {
                thread::sleep(self.pause_between_records);
            }
        }
        Ok(summary)
    }
}
