// 💾 Writer - roster and aggregate CSV files
// Header row always present, no index column, existing files overwritten

use crate::error::{EtlError, Result};
use crate::records::{AggregateRow, PersonEmailRow};
use csv::WriterBuilder;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// What was written, with a digest for comparing reruns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub rows: usize,
    pub sha256: String,
}

/// Serialize rows under an explicit header so zero-row files keep it
fn render<T: Serialize>(headers: &[&str], rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer.into_inner().map_err(|e| EtlError::Io(e.into_error()))
}

fn write_rows<T: Serialize>(path: &Path, headers: &[&str], rows: &[T]) -> Result<WrittenFile> {
    let bytes = render(headers, rows)?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let sha256 = format!("{:x}", hasher.finalize());

    // Rendered fully before touching disk: a failure leaves no partial file
    fs::write(path, &bytes)?;

    info!(path = %path.display(), rows = rows.len(), sha256 = %sha256, "saved file");
    Ok(WrittenFile {
        path: path.to_path_buf(),
        rows: rows.len(),
        sha256,
    })
}

/// Write the person-level roster (`email, code, is unsub, created_dt, updated_dt`)
pub fn write_roster(path: &Path, rows: &[PersonEmailRow]) -> Result<WrittenFile> {
    write_rows(path, &PersonEmailRow::HEADERS, rows)
}

/// Write the daily aggregate (`acquisition date, acquisitions`)
pub fn write_aggregates(path: &Path, rows: &[AggregateRow]) -> Result<WrittenFile> {
    write_rows(path, &AggregateRow::HEADERS, rows)
}

/// Read a roster file back
pub fn read_roster(path: &Path) -> Result<Vec<PersonEmailRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

/// Read an aggregate file back
pub fn read_aggregates(path: &Path) -> Result<Vec<AggregateRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn roster() -> Vec<PersonEmailRow> {
        let created = NaiveDate::from_ymd_opt(2020, 7, 1).unwrap().and_hms_opt(17, 11, 0);
        vec![
            PersonEmailRow {
                email: "a@example.com".to_string(),
                code: "X".to_string(),
                is_unsub: true,
                created_dt: created,
                updated_dt: created,
            },
            PersonEmailRow {
                email: "b@example.com".to_string(),
                code: "".to_string(),
                is_unsub: false,
                created_dt: None,
                updated_dt: None,
            },
        ]
    }

    #[test]
    fn test_roster_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.csv");

        let written = write_roster(&path, &roster()).unwrap();
        let read_back = read_roster(&path).unwrap();

        assert_eq!(written.rows, 2);
        assert_eq!(read_back, roster());
    }

    #[test]
    fn test_roster_header_and_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.csv");

        write_roster(&path, &roster()).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines[0], "email,code,is unsub,created_dt,updated_dt");
        assert_eq!(lines[1], "a@example.com,X,true,2020-07-01 17:11:00,2020-07-01 17:11:00");
        assert_eq!(lines[2], "b@example.com,,false,,");
    }

    #[test]
    fn test_empty_aggregate_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aggregates.csv");

        let written = write_aggregates(&path, &[]).unwrap();
        let contents = fs::read_to_string(&path).unwrap();

        assert_eq!(written.rows, 0);
        assert_eq!(contents.lines().collect::<Vec<_>>(), vec!["acquisition date,acquisitions"]);
        assert!(read_aggregates(&path).unwrap().is_empty());
    }

    #[test]
    fn test_overwrite_and_stable_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aggregates.csv");
        fs::write(&path, "stale contents\n").unwrap();

        let rows = vec![AggregateRow {
            acquisition_date: NaiveDate::from_ymd_opt(2020, 7, 1).unwrap(),
            acquisitions: 3,
        }];
        let first = write_aggregates(&path, &rows).unwrap();
        let second = write_aggregates(&path, &rows).unwrap();

        assert_eq!(first.sha256, second.sha256);
        assert_eq!(
            fs::read_to_string(&path).unwrap().lines().nth(1),
            Some("2020-07-01,3")
        );
    }
}
