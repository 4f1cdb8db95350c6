// ⚙️ Pipeline configuration
// Source locations and output paths, defaulting to the published extracts

use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONSTITUENT_INFO: &str =
    "https://als-hiring.s3.amazonaws.com/fake_data/2020-07-01_17%3A11%3A00/cons.csv";
pub const CONSTITUENT_EMAILS: &str =
    "https://als-hiring.s3.amazonaws.com/fake_data/2020-07-01_17%3A11%3A00/cons_email.csv";
pub const CONSTITUENT_STATUS: &str =
    "https://als-hiring.s3.amazonaws.com/fake_data/2020-07-01_17%3A11%3A00/cons_email_chapter_subscription.csv";

/// Where each of the three extracts lives (URL or filesystem path)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLocations {
    pub constituents: String,
    pub emails: String,
    pub subscriptions: String,
}

impl Default for SourceLocations {
    fn default() -> Self {
        SourceLocations {
            constituents: CONSTITUENT_INFO.to_string(),
            emails: CONSTITUENT_EMAILS.to_string(),
            subscriptions: CONSTITUENT_STATUS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sources: SourceLocations,

    /// Directory both output files land in
    pub output_dir: PathBuf,

    pub roster_file: String,
    pub aggregate_file: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            sources: SourceLocations::default(),
            output_dir: PathBuf::from("."),
            roster_file: "people.csv".to_string(),
            aggregate_file: "aggregates.csv".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file; omitted keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            EtlError::Config(format!("failed to read {}: {}", path.as_ref().display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            EtlError::Config(format!("failed to parse {}: {}", path.as_ref().display(), e))
        })
    }

    /// Use the file when it exists, otherwise the built-in defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            info!(path = %path.as_ref().display(), "loading pipeline config");
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn roster_path(&self) -> PathBuf {
        self.output_dir.join(&self.roster_file)
    }

    pub fn aggregate_path(&self) -> PathBuf {
        self.output_dir.join(&self.aggregate_file)
    }
}

// ============================================================================
// TESTS
// ============================================================================
