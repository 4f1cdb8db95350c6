// 🚚 Pipeline - Loader → Merger → Normalizer → Aggregator → Writer
// Each stage takes the previous stage's output by value and returns a new table

use crate::aggregator::{aggregate, DuplicateEmailWarning};
use crate::config::{PipelineConfig, SourceLocations};
use crate::error::Result;
use crate::loader::{load_records, source_for, DataSource};
use crate::merger::merge;
use crate::normalizer::normalize;
use crate::records::{ConstituentRecord, EmailRecord, PersonEmailRow, SubscriptionRecord};
use crate::writer::{write_aggregates, write_roster, WrittenFile};
use serde::Serialize;
use std::fs;
use tracing::{info, info_span};

// ============================================================================
// SOURCES
// ============================================================================

/// The three extracts a run reads
pub struct Sources {
    pub constituents: Box<dyn DataSource>,
    pub emails: Box<dyn DataSource>,
    pub subscriptions: Box<dyn DataSource>,
}

impl Sources {
    pub fn from_locations(locations: &SourceLocations) -> Result<Self> {
        Ok(Sources {
            constituents: source_for("constituents", &locations.constituents)?,
            emails: source_for("emails", &locations.emails)?,
            subscriptions: source_for("subscriptions", &locations.subscriptions)?,
        })
    }
}

// ============================================================================
// RUN SUMMARY
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub constituents_loaded: usize,
    pub emails_loaded: usize,
    pub subscriptions_loaded: usize,
    pub roster_rows: usize,

    /// `None` when there were no primary emails and the roster was skipped
    pub roster_file: Option<WrittenFile>,
    pub aggregate_file: WrittenFile,
    pub total_acquisitions: usize,
    pub undated_rows: usize,
    pub duplicate_warning: Option<DuplicateEmailWarning>,
}

impl RunSummary {
    pub fn summary(&self) -> String {
        format!(
            "Loaded {}/{}/{} rows (constituents/emails/subscriptions), roster: {}, aggregate: {} dates / {} acquisitions{}",
            self.constituents_loaded,
            self.emails_loaded,
            self.subscriptions_loaded,
            match &self.roster_file {
                Some(file) => format!("{} rows", file.rows),
                None => "skipped".to_string(),
            },
            self.aggregate_file.rows,
            self.total_acquisitions,
            match &self.duplicate_warning {
                Some(w) => format!(", {} duplicate email rows", w.duplicates()),
                None => String::new(),
            }
        )
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run against the configured source locations
    pub fn run(&self) -> Result<RunSummary> {
        let sources = Sources::from_locations(&self.config.sources)?;
        self.run_with_sources(&sources)
    }

    /// Run against explicit sources
    ///
    /// Any error aborts before the next write; a normalisation failure leaves
    /// neither output file written.
    pub fn run_with_sources(&self, sources: &Sources) -> Result<RunSummary> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("pipeline", run_id = %run_id);
        let _guard = span.enter();

        // 1. Load
        let constituents: Vec<ConstituentRecord> =
            load_records(sources.constituents.as_ref(), &ConstituentRecord::COLUMNS)?;
        let emails: Vec<EmailRecord> = load_records(sources.emails.as_ref(), &EmailRecord::COLUMNS)?;
        let subscriptions: Vec<SubscriptionRecord> =
            load_records(sources.subscriptions.as_ref(), &SubscriptionRecord::COLUMNS)?;

        // 2. Merge
        let merged = merge(&emails, &constituents, &subscriptions);

        // 3. Normalize, only when primary emails exist
        let roster: Option<Vec<PersonEmailRow>> = if merged.is_empty() {
            info!("no primary emails; skipping roster");
            None
        } else {
            Some(normalize(merged)?)
        };

        // Nothing touches the output directory until every fallible stage passed
        fs::create_dir_all(&self.config.output_dir)?;

        let roster_file: Option<WrittenFile> = match &roster {
            Some(rows) => Some(write_roster(&self.config.roster_path(), rows)?),
            None => None,
        };
        let roster = roster.unwrap_or_default();

        // 4. Aggregate, always
        let outcome = aggregate(&roster);
        let aggregate_file = write_aggregates(&self.config.aggregate_path(), &outcome.rows)?;

        let summary = RunSummary {
            run_id,
            constituents_loaded: constituents.len(),
            emails_loaded: emails.len(),
            subscriptions_loaded: subscriptions.len(),
            roster_rows: roster.len(),
            roster_file,
            aggregate_file,
            total_acquisitions: outcome.total_acquisitions(),
            undated_rows: outcome.undated_rows,
            duplicate_warning: outcome.duplicate_warning,
        };
        info!("{}", summary.summary());
        Ok(summary)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::loader::InlineSource;
    use crate::writer::{read_aggregates, read_roster};
    use chrono::NaiveDate;
    use std::path::Path;

    const CONS: &str = "cons_id,create_dt,modified_dt,source\n\
        5,2020-07-01 17:11:00,2020-07-02 09:30:00,X\n\
        6,2020-07-01 08:00:00,2020-07-01 08:00:00,Y\n\
        7,2020-07-03 12:00:00,2020-07-04 12:00:00,Z\n";

    fn sources(cons: &str, emails: &str, subs: &str) -> Sources {
        Sources {
            constituents: Box::new(InlineSource::new("constituents", cons)),
            emails: Box::new(InlineSource::new("emails", emails)),
            subscriptions: Box::new(InlineSource::new("subscriptions", subs)),
        }
    }

    fn pipeline(dir: &Path) -> Pipeline {
        Pipeline::new(PipelineConfig {
            output_dir: dir.to_path_buf(),
            ..PipelineConfig::default()
        })
    }

    #[test]
    fn test_single_constituent_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let sources = sources(
            "cons_id,create_dt,modified_dt,source\n5,2020-07-01 17:11:00,2020-07-02 09:30:00,X\n",
            "email,cons_email_id,cons_id,is_primary\na@example.com,100,5,1\n",
            "cons_email_id,chapter_id,isunsub\n200,1,1\n",
        );

        let summary = pipeline(dir.path()).run_with_sources(&sources).unwrap();

        let roster = read_roster(&dir.path().join("people.csv")).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].email, "a@example.com");
        assert_eq!(roster[0].code, "X");
        assert!(!roster[0].is_unsub);

        let aggregates = read_aggregates(&dir.path().join("aggregates.csv")).unwrap();
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].acquisition_date, NaiveDate::from_ymd_opt(2020, 7, 1).unwrap());
        assert_eq!(aggregates[0].acquisitions, 1);
        assert!(summary.duplicate_warning.is_none());
    }

    #[test]
    fn test_no_primary_emails_skips_roster_but_writes_aggregate() {
        let dir = tempfile::tempdir().unwrap();
        let sources = sources(
            CONS,
            "email,cons_email_id,cons_id,is_primary\na@example.com,100,5,0\nb@example.com,101,6,0\n",
            "cons_email_id,chapter_id,isunsub\n100,1,1\n",
        );

        let summary = pipeline(dir.path()).run_with_sources(&sources).unwrap();

        assert!(summary.roster_file.is_none());
        assert!(!dir.path().join("people.csv").exists());

        let contents = fs::read_to_string(dir.path().join("aggregates.csv")).unwrap();
        assert_eq!(contents.lines().collect::<Vec<_>>(), vec!["acquisition date,acquisitions"]);
        assert_eq!(summary.aggregate_file.rows, 0);
    }

    #[test]
    fn test_duplicate_emails_kept_in_roster_counted_once() {
        let dir = tempfile::tempdir().unwrap();
        let sources = sources(
            CONS,
            "email,cons_email_id,cons_id,is_primary\n\
             dup@example.com,100,5,1\n\
             dup@example.com,101,6,1\n",
            "cons_email_id,chapter_id,isunsub\n100,1,0\n",
        );

        let summary = pipeline(dir.path()).run_with_sources(&sources).unwrap();

        let roster = read_roster(&dir.path().join("people.csv")).unwrap();
        assert_eq!(roster.len(), 2);

        let warning = summary.duplicate_warning.unwrap();
        assert_eq!(warning.rows, 2);
        assert_eq!(warning.distinct_emails, 1);

        let aggregates = read_aggregates(&dir.path().join("aggregates.csv")).unwrap();
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].acquisitions, 1);
    }

    #[test]
    fn test_roster_flags_follow_chapter_one_subscriptions() {
        let dir = tempfile::tempdir().unwrap();
        let sources = sources(
            CONS,
            "email,cons_email_id,cons_id,is_primary\n\
             a@example.com,100,5,1\n\
             a-old@example.com,99,5,0\n\
             b@example.com,101,6,1\n\
             c@example.com,102,7,1\n",
            "cons_email_id,chapter_id,isunsub\n\
             100,1,1\n\
             101,2,1\n\
             102,1,0\n\
             99,1,1\n",
        );

        let summary = pipeline(dir.path()).run_with_sources(&sources).unwrap();
        let roster = read_roster(&dir.path().join("people.csv")).unwrap();

        let flags: Vec<(&str, bool)> = roster.iter().map(|r| (r.email.as_str(), r.is_unsub)).collect();
        assert_eq!(
            flags,
            vec![("a@example.com", true), ("b@example.com", false), ("c@example.com", false)]
        );
        assert_eq!(summary.total_acquisitions, 3);

        let aggregates = read_aggregates(&dir.path().join("aggregates.csv")).unwrap();
        let total: usize = aggregates.iter().map(|a| a.acquisitions).sum();
        assert_eq!(total, 3);
        assert_eq!(aggregates[0].acquisitions, 2);
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let sources = sources(
            CONS,
            "email,cons_email_id,cons_id,is_primary\na@example.com,100,5,1\nb@example.com,101,7,1\n",
            "cons_email_id,chapter_id,isunsub\n101,1,1\n",
        );
        let pipeline = pipeline(dir.path());

        let first = pipeline.run_with_sources(&sources).unwrap();
        let roster_bytes = fs::read(dir.path().join("people.csv")).unwrap();
        let second = pipeline.run_with_sources(&sources).unwrap();

        assert_eq!(roster_bytes, fs::read(dir.path().join("people.csv")).unwrap());
        assert_eq!(first.roster_file.unwrap().sha256, second.roster_file.unwrap().sha256);
        assert_eq!(first.aggregate_file.sha256, second.aggregate_file.sha256);
        assert_ne!(first.run_id, second.run_id);
    }

    #[test]
    fn test_bad_date_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sources = sources(
            "cons_id,create_dt,modified_dt,source\n5,sometime,2020-07-02 09:30:00,X\n",
            "email,cons_email_id,cons_id,is_primary\na@example.com,100,5,1\n",
            "cons_email_id,chapter_id,isunsub\n100,1,1\n",
        );

        let err = pipeline(dir.path()).run_with_sources(&sources).unwrap_err();

        assert!(matches!(err, EtlError::DateParse { ref cons_id, .. } if cons_id == "5"));
        assert!(!dir.path().join("people.csv").exists());
        assert!(!dir.path().join("aggregates.csv").exists());
    }

    #[test]
    fn test_empty_source_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let sources = sources(
            CONS,
            "email,cons_email_id,cons_id,is_primary\na@example.com,100,5,1\n",
            "cons_email_id,chapter_id,isunsub\n",
        );

        let err = pipeline(dir.path()).run_with_sources(&sources).unwrap_err();

        assert!(matches!(err, EtlError::EmptyData { ref source_name } if source_name == "subscriptions"));
        assert!(!dir.path().join("aggregates.csv").exists());
    }

    #[test]
    fn test_run_reads_configured_file_locations() {
        let dir = tempfile::tempdir().unwrap();
        let cons = dir.path().join("cons.csv");
        let emails = dir.path().join("cons_email.csv");
        let subs = dir.path().join("subs.csv");
        fs::write(&cons, CONS).unwrap();
        fs::write(&emails, "email,cons_email_id,cons_id,is_primary\na@example.com,100,5,1\n").unwrap();
        fs::write(&subs, "cons_email_id,chapter_id,isunsub\n100,1,1\n").unwrap();

        let config = PipelineConfig {
            sources: SourceLocations {
                constituents: cons.display().to_string(),
                emails: emails.display().to_string(),
                subscriptions: subs.display().to_string(),
            },
            output_dir: dir.path().join("out"),
            ..PipelineConfig::default()
        };

        let summary = Pipeline::new(config).run().unwrap();

        assert_eq!(summary.constituents_loaded, 3);
        assert_eq!(summary.roster_rows, 1);
        assert!(dir.path().join("out").join("people.csv").exists());
    }

    #[test]
    fn test_bad_date_leaves_no_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("fresh-out");
        let sources = sources(
            "cons_id,create_dt,modified_dt,source\n5,2020-07-01 17:11:00,whenever,X\n",
            "email,cons_email_id,cons_id,is_primary\na@example.com,100,5,1\n",
            "cons_email_id,chapter_id,isunsub\n100,1,1\n",
        );

        let err = pipeline(&out).run_with_sources(&sources).unwrap_err();

        assert!(matches!(err, EtlError::DateParse { ref column, .. } if column == "updated_dt"));
        assert!(!out.exists());
    }
}
