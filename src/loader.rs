// 📥 Loader - fetch tabular sources and check they hold data
// Sources are pluggable: files, HTTP endpoints, or in-memory CSV for tests

use crate::error::{EtlError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

// ============================================================================
// DATA SOURCE TRAIT
// ============================================================================

/// DataSource - anything that can hand back a CSV document
///
/// Adding a new kind of location means implementing this trait; the stages
/// downstream never see where the bytes came from.
pub trait DataSource {
    /// Logical name used in logs and errors (e.g. "constituents")
    fn name(&self) -> &str;

    /// Retrieve the full CSV text
    ///
    /// Any failure to reach the source is `EtlError::SourceUnavailable`.
    fn fetch(&self) -> Result<String>;
}

/// Local file on disk
pub struct FileSource {
    name: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        FileSource {
            name: name.to_string(),
            path: path.into(),
        }
    }
}

impl DataSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| {
            EtlError::unavailable(&self.name, format!("{}: {}", self.path.display(), e))
        })
    }
}

/// Remote CSV fetched over HTTP(S) with a blocking client
///
/// No retries and no timeout: the client's default 30s limit is switched
/// off, so a slow download runs to completion or fails on its own.
pub struct HttpSource {
    name: String,
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(name: &str, url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()
            .map_err(|e| EtlError::unavailable(name, e))?;

        Ok(HttpSource {
            name: name.to_string(),
            url: url.to_string(),
            client,
        })
    }
}

impl DataSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| EtlError::unavailable(&self.name, e))?;

        response
            .text()
            .map_err(|e| EtlError::unavailable(&self.name, e))
    }
}

/// CSV text held in memory
pub struct InlineSource {
    name: String,
    body: String,
}

impl InlineSource {
    pub fn new(name: &str, body: &str) -> Self {
        InlineSource {
            name: name.to_string(),
            body: body.to_string(),
        }
    }
}

impl DataSource for InlineSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<String> {
        Ok(self.body.clone())
    }
}

/// Pick a source implementation for a location string
///
/// `http://` and `https://` go over the network, anything else is a path.
pub fn source_for(name: &str, location: &str) -> Result<Box<dyn DataSource>> {
    let lower = location.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Ok(Box::new(HttpSource::new(name, location)?))
    } else {
        Ok(Box::new(FileSource::new(name, location)))
    }
}

// ============================================================================
// RAW TABLE
// ============================================================================

/// Parsed CSV: header row plus data records, all cells still text
#[derive(Debug, Clone)]
pub struct RawTable {
    pub source_name: String,
    pub headers: StringRecord,
    pub records: Vec<StringRecord>,
}

impl RawTable {
    /// Parse CSV text with a header row
    pub fn parse(source_name: &str, body: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::Headers)
            .from_reader(body.as_bytes());

        let headers = reader.headers()?.clone();
        let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(RawTable {
            source_name: source_name.to_string(),
            headers,
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Presence check only: types are not validated here
    pub fn require_columns(&self, columns: &[&str]) -> Result<()> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(EtlError::MissingColumn {
                source_name: self.source_name.clone(),
                column: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Deserialize every record by header name; extra columns are ignored
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let mut rows = Vec::with_capacity(self.records.len());
        for record in &self.records {
            rows.push(record.deserialize(Some(&self.headers))?);
        }
        Ok(rows)
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Fetch, parse, and validate one source
///
/// Fails with `EmptyData` when the table has no rows and `MissingColumn`
/// when a required header is absent.
pub fn load_table(source: &dyn DataSource, required_columns: &[&str]) -> Result<RawTable> {
    info!(source = source.name(), "reading source");
    let body = source.fetch()?;
    let table = RawTable::parse(source.name(), &body)?;

    if table.is_empty() {
        return Err(EtlError::EmptyData {
            source_name: source.name().to_string(),
        });
    }
    table.require_columns(required_columns)?;

    debug!(source = source.name(), rows = table.len(), "source loaded");
    Ok(table)
}

/// Load a source straight into typed records
pub fn load_records<T: DeserializeOwned>(
    source: &dyn DataSource,
    required_columns: &[&str],
) -> Result<Vec<T>> {
    load_table(source, required_columns)?.decode()
}

// ============================================================================
// TESTS
// ============================================================================
