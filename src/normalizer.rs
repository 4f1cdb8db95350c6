// 🧹 Normalizer - merged rows → canonical roster rows
// Projects, recodes the unsubscribe flag, parses timestamps, coerces text

use crate::error::{EtlError, Result};
use crate::records::{parse_flag, MergedEmailRow, PersonEmailRow};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

/// Date-time layouts accepted for created/updated cells, tried in order
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only layouts, read as midnight
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Drop a leading weekday token such as `Fri, `
///
/// The weekday is redundant once the date is known and is not checked.
fn strip_weekday(value: &str) -> &str {
    match value.split_once(',') {
        Some((day, rest))
            if (3..=9).contains(&day.len()) && day.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            rest.trim_start()
        }
        _ => value,
    }
}

/// Parse a timestamp cell
///
/// Offsets (RFC 3339 / RFC 2822) are converted to UTC and dropped.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.naive_utc());
    }

    let value = strip_weekday(value);

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Recode the unsubscribe flag: 1 ⇒ true, 0 ⇒ false, missing ⇒ false
///
/// A missing chapter-1 subscription row means the address is still subscribed.
pub fn recode_unsub(raw: Option<&str>) -> bool {
    parse_flag(raw).unwrap_or(false)
}

/// Parse one timestamp column; empty cells stay `None`, bad cells abort
///
/// Cells come paired with the owning `cons_id` so errors point back at the
/// constituent extract.
fn parse_column<'a, I>(column: &str, cells: I) -> Result<Vec<Option<NaiveDateTime>>>
where
    I: Iterator<Item = (Option<&'a str>, Option<&'a str>)>,
{
    let mut parsed = Vec::new();
    for (i, (cons_id, cell)) in cells.enumerate() {
        let value = match cell.map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(parse_timestamp(text).ok_or_else(|| EtlError::DateParse {
                column: column.to_string(),
                cons_id: cons_id.unwrap_or("unknown").to_string(),
                merged_row: i + 1,
                value: text.to_string(),
            })?),
        };
        parsed.push(value);
    }
    Ok(parsed)
}

/// Transform merged rows into roster rows
///
/// Fails with `DateParse` on the first unparsable created value, then the
/// first unparsable updated value; no rows are returned on failure.
pub fn normalize(rows: Vec<MergedEmailRow>) -> Result<Vec<PersonEmailRow>> {
    debug!(rows = rows.len(), "recoding unsubscribe flag");
    let unsub: Vec<bool> = rows.iter().map(|r| recode_unsub(r.isunsub.as_deref())).collect();

    debug!("recoding dates");
    let created = parse_column(
        "created_dt",
        rows.iter().map(|r| (r.cons_id.as_deref(), r.create_dt.as_deref())),
    )?;
    let updated = parse_column(
        "updated_dt",
        rows.iter().map(|r| (r.cons_id.as_deref(), r.modified_dt.as_deref())),
    )?;

    debug!("recoding email and source code");
    let roster: Vec<PersonEmailRow> = rows
        .into_iter()
        .zip(unsub)
        .zip(created.into_iter().zip(updated))
        .map(|((row, is_unsub), (created_dt, updated_dt))| PersonEmailRow {
            email: row.email.unwrap_or_default(),
            code: row.source.unwrap_or_default(),
            is_unsub,
            created_dt,
            updated_dt,
        })
        .collect();

    info!(rows = roster.len(), "normalized roster");
    Ok(roster)
}

// ============================================================================
// TESTS
// ============================================================================
