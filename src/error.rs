use thiserror::Error;

/// Failure taxonomy for the ingestion pipeline.
///
/// `StorageUnavailable` and `RecordNotFound` abort the run.
/// `RemoteUnavailable` means "unknown", never "absent"; callers must not
/// advance local state on it. `SubmitRejected` is isolated per record.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("record catalog unavailable: {0}")]
    StorageUnavailable(String),
    #[error("no catalog record with url {0}")]
    RecordNotFound(String),
    #[error("archive unreachable: {0}")]
    RemoteUnavailable(String),
    #[error("archive rejected submission with status {status}: {body}")]
    SubmitRejected { status: u16, body: String },
}
