// 📊 Aggregator - daily acquisition counts from the roster
// Dedupe on (email, acquisition date), then count per date

use crate::records::{AggregateRow, PersonEmailRow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{info, warn};

// ============================================================================
// DUPLICATE WARNING
// ============================================================================

/// Roster has more rows than distinct addresses
///
/// Non-fatal. Duplicates stay in the roster; only the aggregate dedupes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateEmailWarning {
    pub rows: usize,
    pub distinct_emails: usize,
}

impl DuplicateEmailWarning {
    pub fn duplicates(&self) -> usize {
        self.rows.saturating_sub(self.distinct_emails)
    }
}

impl fmt::Display for DuplicateEmailWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "roster contains duplicate emails ({} rows, {} distinct); aggregates may be off",
            self.rows, self.distinct_emails
        )
    }
}

/// Compare row count with distinct email count
pub fn check_duplicates(roster: &[PersonEmailRow]) -> Option<DuplicateEmailWarning> {
    let distinct: HashSet<&str> = roster.iter().map(|r| r.email.as_str()).collect();
    if roster.len() > distinct.len() {
        Some(DuplicateEmailWarning {
            rows: roster.len(),
            distinct_emails: distinct.len(),
        })
    } else {
        None
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct AggregateOutcome {
    /// One row per acquisition date, ascending
    pub rows: Vec<AggregateRow>,

    pub duplicate_warning: Option<DuplicateEmailWarning>,

    /// Roster rows without a created timestamp; they have no acquisition date
    pub undated_rows: usize,
}

impl AggregateOutcome {
    pub fn total_acquisitions(&self) -> usize {
        self.rows.iter().map(|r| r.acquisitions).sum()
    }
}

/// Count distinct (email, acquisition date) pairs per date
///
/// An empty roster yields an empty outcome, never an error.
pub fn aggregate(roster: &[PersonEmailRow]) -> AggregateOutcome {
    let duplicate_warning = check_duplicates(roster);
    if let Some(w) = &duplicate_warning {
        warn!(rows = w.rows, distinct = w.distinct_emails, "{}", w);
    }

    let mut seen: HashSet<(&str, NaiveDate)> = HashSet::new();
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut undated_rows = 0;

    for row in roster {
        let Some(date) = row.acquisition_date() else {
            undated_rows += 1;
            continue;
        };
        if seen.insert((row.email.as_str(), date)) {
            *per_day.entry(date).or_insert(0) += 1;
        }
    }

    let rows: Vec<AggregateRow> = per_day
        .into_iter()
        .map(|(acquisition_date, acquisitions)| AggregateRow {
            acquisition_date,
            acquisitions,
        })
        .collect();

    info!(
        dates = rows.len(),
        acquisitions = seen.len(),
        undated = undated_rows,
        "created aggregate acquisition data"
    );

    AggregateOutcome {
        rows,
        duplicate_warning,
        undated_rows,
    }
}

// ============================================================================
// TESTS
// ============================================================================
