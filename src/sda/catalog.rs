use crate::error::ArchiveError;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const INGESTED_COLUMN: &str = "ingested";
const INGESTED_TRUE: &str = "True";
const INGESTED_FALSE: &str = "False";

/// One row of the scraped report catalog. The URL is the idempotency key
/// shared with the remote archive; `ingested` only ever moves False -> True.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub ingested: bool,
}

/// CSV-backed record store. Every mutation rewrites the whole file through a
/// sibling temp file that is atomically renamed over the original, so a crash
/// mid-write leaves either the old or the new full content. O(n) per update
/// is a known scaling limit at catalog sizes beyond the low thousands.
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
}

fn storage_err(path: &Path, detail: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::StorageUnavailable(format!("{}: {detail}", path.display()))
}

fn read_all(path: &Path) -> Result<(StringRecord, Vec<StringRecord>), ArchiveError> {
    let mut reader = csv::Reader::from_path(path).map_err(|err| storage_err(path, err))?;
    let headers = reader
        .headers()
        .map_err(|err| storage_err(path, err))?
        .clone();
    let mut rows = Vec::new();
    for row in reader.records() {
        rows.push(row.map_err(|err| storage_err(path, err))?);
    }
    Ok((headers, rows))
}

fn rewrite_atomic(
    path: &Path,
    headers: &StringRecord,
    rows: &[StringRecord],
) -> Result<(), ArchiveError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let tmp = match dir {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new(),
    }
    .map_err(|err| storage_err(path, err))?;

    {
        let mut writer = csv::Writer::from_writer(tmp.as_file());
        writer
            .write_record(headers)
            .map_err(|err| storage_err(path, err))?;
        for row in rows {
            writer
                .write_record(row)
                .map_err(|err| storage_err(path, err))?;
        }
        writer.flush().map_err(|err| storage_err(path, err))?;
    }

    tmp.persist(path)
        .map_err(|err| storage_err(path, err.error))?;
    Ok(())
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

impl Catalog {
    /// Opens the catalog and guarantees the completion-flag column exists.
    /// A catalog written before the flag was introduced is migrated in place:
    /// the original is preserved as `<path>.bak`, then rewritten with the
    /// column appended and every row defaulting to `"False"`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let path = path.into();
        if !path.is_file() {
            return Err(storage_err(&path, "no such file"));
        }

        let (headers, rows) = read_all(&path)?;
        if column_index(&headers, "url").is_none() {
            return Err(storage_err(&path, "missing url column"));
        }

        if column_index(&headers, INGESTED_COLUMN).is_none() {
            let backup = backup_path(&path);
            fs::copy(&path, &backup).map_err(|err| storage_err(&backup, err))?;

            let mut migrated_headers = headers.clone();
            migrated_headers.push_field(INGESTED_COLUMN);
            let migrated_rows: Vec<StringRecord> = rows
                .into_iter()
                .map(|mut row| {
                    row.push_field(INGESTED_FALSE);
                    row
                })
                .collect();
            rewrite_atomic(&path, &migrated_headers, &migrated_rows)?;
        }

        Ok(Self { path })
    }

    /// Reads the full record set in file order.
    pub fn load(&self) -> Result<Vec<CatalogRecord>, ArchiveError> {
        let (headers, rows) = read_all(&self.path)?;
        let url_idx =
            column_index(&headers, "url").ok_or_else(|| storage_err(&self.path, "missing url column"))?;
        let title_idx = column_index(&headers, "title");
        let description_idx = column_index(&headers, "description");
        let date_idx = column_index(&headers, "date");
        let ingested_idx = column_index(&headers, INGESTED_COLUMN)
            .ok_or_else(|| storage_err(&self.path, "missing ingested column"))?;

        let field = |row: &StringRecord, idx: Option<usize>| -> String {
            idx.and_then(|i| row.get(i)).unwrap_or_default().to_string()
        };

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let url = row.get(url_idx).unwrap_or_default().to_string();
            if url.trim().is_empty() {
                continue;
            }
            out.push(CatalogRecord {
                url,
                title: field(&row, title_idx),
                description: field(&row, description_idx),
                date: field(&row, date_idx),
                ingested: row.get(ingested_idx) == Some(INGESTED_TRUE),
            });
        }
        Ok(out)
    }

    /// Sets the completion flag for the record with the given URL.
    /// The flag is monotonic: this only ever writes `"True"`.
    pub fn mark_ingested(&self, url: &str) -> Result<(), ArchiveError> {
        let (headers, rows) = read_all(&self.path)?;
        let url_idx = column_index(&headers, "url")
            .ok_or_else(|| storage_err(&self.path, "missing url column"))?;
        let ingested_idx = column_index(&headers, INGESTED_COLUMN)
            .ok_or_else(|| storage_err(&self.path, "missing ingested column"))?;

        let mut found = false;
        let updated: Vec<StringRecord> = rows
            .into_iter()
            .map(|row| {
                if row.get(url_idx) != Some(url) {
                    return row;
                }
                found = true;
                let cells: Vec<&str> = row
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| if i == ingested_idx { INGESTED_TRUE } else { cell })
                    .collect();
                StringRecord::from(cells)
            })
            .collect();

        if !found {
            return Err(ArchiveError::RecordNotFound(url.to_string()));
        }
        rewrite_atomic(&self.path, &headers, &updated)
    }
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".bak");
    PathBuf::from(os)
}

/// The archive expects `metadata_time` as an ISO-8601 date.
pub fn is_iso_date(raw: &str) -> bool {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_catalog(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).expect("write catalog");
        path
    }

    #[test]
    fn open_migrates_missing_ingested_column_and_keeps_backup() {
        let tmp = tempdir().expect("tempdir");
        let path = write_catalog(
            tmp.path(),
            "reports.csv",
            "url,title,description,date\nhttps://x/doc1,Doc 1,First,2025-01-02\n",
        );

        let catalog = Catalog::open(&path).expect("open");
        let records = catalog.load().expect("load");
        assert_eq!(records.len(), 1);
        assert!(!records[0].ingested);

        let rewritten = fs::read_to_string(&path).expect("read rewritten");
        assert!(rewritten.lines().next().unwrap().ends_with(",ingested"));
        assert!(rewritten.contains(",False"));

        let backup = fs::read_to_string(backup_path(&path)).expect("read backup");
        assert!(!backup.contains("ingested"));
    }

    #[test]
    fn open_is_a_no_op_when_column_already_present() {
        let tmp = tempdir().expect("tempdir");
        let path = write_catalog(
            tmp.path(),
            "reports.csv",
            "url,title,description,date,ingested\nhttps://x/doc1,Doc 1,First,2025-01-02,True\n",
        );

        let catalog = Catalog::open(&path).expect("open");
        let records = catalog.load().expect("load");
        assert!(records[0].ingested);
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn open_fails_on_missing_file() {
        let tmp = tempdir().expect("tempdir");
        let err = Catalog::open(tmp.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, ArchiveError::StorageUnavailable(_)));
    }

    #[test]
    fn mark_ingested_flips_only_the_target_row() {
        let tmp = tempdir().expect("tempdir");
        let path = write_catalog(
            tmp.path(),
            "reports.csv",
            "url,title,description,date,ingested\n\
             https://x/doc1,Doc 1,First,2025-01-02,False\n\
             https://x/doc2,Doc 2,Second,2025-01-03,False\n",
        );

        let catalog = Catalog::open(&path).expect("open");
        catalog.mark_ingested("https://x/doc1").expect("mark");

        let records = catalog.load().expect("load");
        assert!(records[0].ingested);
        assert!(!records[1].ingested);
    }

    #[test]
    fn mark_ingested_rejects_unknown_url() {
        let tmp = tempdir().expect("tempdir");
        let path = write_catalog(
            tmp.path(),
            "reports.csv",
            "url,title,description,date,ingested\nhttps://x/doc1,Doc 1,First,2025-01-02,False\n",
        );

        let catalog = Catalog::open(&path).expect("open");
        let err = catalog.mark_ingested("https://x/absent").unwrap_err();
        assert!(matches!(err, ArchiveError::RecordNotFound(_)));
    }

    #[test]
    fn rewrite_leaves_no_partial_state_behind() {
        let tmp = tempdir().expect("tempdir");
        let path = write_catalog(
            tmp.path(),
            "reports.csv",
            "url,title,description,date,ingested\nhttps://x/doc1,Doc 1,First,2025-01-02,False\n",
        );

        let catalog = Catalog::open(&path).expect("open");
        catalog.mark_ingested("https://x/doc1").expect("mark");

        // The replacement is rename-based: after the write the directory
        // holds exactly the catalog, with a full header and full rows.
        let entries: Vec<_> = fs::read_dir(tmp.path())
            .expect("read dir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(entries.len(), 1);

        let content = fs::read_to_string(&path).expect("read");
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("url,title,description,date,ingested")
        );
        assert_eq!(
            lines.next(),
            Some("https://x/doc1,Doc 1,First,2025-01-02,True")
        );
    }

    #[test]
    fn fields_preserve_commas_through_rewrite() {
        let tmp = tempdir().expect("tempdir");
        let path = write_catalog(
            tmp.path(),
            "reports.csv",
            "url,title,description,date,ingested\n\
             https://x/doc1,\"Doc, one\",\"First, report\",2025-01-02,False\n",
        );

        let catalog = Catalog::open(&path).expect("open");
        catalog.mark_ingested("https://x/doc1").expect("mark");

        let records = catalog.load().expect("load");
        assert_eq!(records[0].title, "Doc, one");
        assert_eq!(records[0].description, "First, report");
        assert!(records[0].ingested);
    }

    #[test]
    fn iso_date_validation() {
        assert!(is_iso_date("2025-01-02"));
        assert!(!is_iso_date("January 2, 2025"));
        assert!(!is_iso_date(""));
    }
}
