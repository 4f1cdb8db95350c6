// 📇 Record Model - source extracts and derived rows
// Source records keep cells as raw text; interpretation happens in the stages.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// SOURCE RECORDS
// ============================================================================

/// One row of the constituent extract (`cons.csv`)
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ConstituentRecord {
    #[serde(deserialize_with = "de_key")]
    pub cons_id: Option<String>,
    pub create_dt: Option<String>,
    pub modified_dt: Option<String>,
    pub source: Option<String>,
}

impl ConstituentRecord {
    pub const COLUMNS: [&'static str; 4] = ["cons_id", "create_dt", "modified_dt", "source"];
}

/// One row of the constituent email extract (`cons_email.csv`)
///
/// A constituent can own several addresses; only the primary one is kept.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct EmailRecord {
    pub email: Option<String>,
    #[serde(deserialize_with = "de_key")]
    pub cons_email_id: Option<String>,
    #[serde(deserialize_with = "de_key")]
    pub cons_id: Option<String>,
    pub is_primary: Option<String>,
}

impl EmailRecord {
    pub const COLUMNS: [&'static str; 4] = ["email", "cons_email_id", "cons_id", "is_primary"];

    /// Primary means the flag is exactly 1 (or literal `true`)
    pub fn is_primary(&self) -> bool {
        match self.is_primary.as_deref().map(str::trim) {
            Some(raw) if raw.eq_ignore_ascii_case("true") => true,
            Some(raw) => matches!(parse_number(raw), Some(n) if n == 1.0),
            None => false,
        }
    }
}

/// One row of the email chapter subscription extract
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SubscriptionRecord {
    #[serde(deserialize_with = "de_key")]
    pub cons_email_id: Option<String>,
    #[serde(deserialize_with = "de_key")]
    pub chapter_id: Option<String>,
    pub isunsub: Option<String>,
}

impl SubscriptionRecord {
    pub const COLUMNS: [&'static str; 3] = ["cons_email_id", "chapter_id", "isunsub"];

    /// Only chapter 1 subscriptions are in scope
    pub const CHAPTER: &'static str = "1";

    pub fn in_chapter_scope(&self) -> bool {
        self.chapter_id.as_deref() == Some(Self::CHAPTER)
    }
}

// ============================================================================
// DERIVED ROWS
// ============================================================================

/// Output of the merge: one row per primary email, metadata possibly missing
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergedEmailRow {
    pub email: Option<String>,
    pub cons_email_id: Option<String>,
    pub cons_id: Option<String>,
    pub create_dt: Option<String>,
    pub modified_dt: Option<String>,
    pub source: Option<String>,
    pub isunsub: Option<String>,
}

/// Person-level roster row, the shape written to `people.csv`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PersonEmailRow {
    #[serde(rename = "email")]
    pub email: String,

    #[serde(rename = "code")]
    pub code: String,

    #[serde(rename = "is unsub")]
    pub is_unsub: bool,

    #[serde(rename = "created_dt", with = "timestamp_cell")]
    pub created_dt: Option<NaiveDateTime>,

    #[serde(rename = "updated_dt", with = "timestamp_cell")]
    pub updated_dt: Option<NaiveDateTime>,
}

impl PersonEmailRow {
    pub const HEADERS: [&'static str; 5] = ["email", "code", "is unsub", "created_dt", "updated_dt"];

    /// Acquisition date: creation timestamp with the time of day dropped
    pub fn acquisition_date(&self) -> Option<NaiveDate> {
        self.created_dt.map(|dt| dt.date())
    }
}

/// Daily acquisition count, the shape written to `aggregates.csv`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AggregateRow {
    #[serde(rename = "acquisition date")]
    pub acquisition_date: NaiveDate,

    #[serde(rename = "acquisitions")]
    pub acquisitions: usize,
}

impl AggregateRow {
    pub const HEADERS: [&'static str; 2] = ["acquisition date", "acquisitions"];
}

// ============================================================================
// CELL COERCION
// ============================================================================

/// Parse a numeric cell; NaN counts as missing
pub fn parse_number(raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_nan() => None,
        Ok(n) => Some(n),
        Err(_) => None,
    }
}

/// Interpret a flag cell as a boolean
///
/// Empty ⇒ `None`. Numbers are truthy when nonzero, `true`/`false` are read
/// literally, and any other text counts as set.
pub fn parse_flag(raw: Option<&str>) -> Option<bool> {
    let value = raw?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        return None;
    }
    if value.eq_ignore_ascii_case("true") {
        return Some(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return Some(false);
    }
    match parse_number(value) {
        Some(n) => Some(n != 0.0),
        None => Some(true),
    }
}

/// Normalise a join key so `5`, ` 5 ` and `5.0` all join together
pub fn normalize_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        if n.is_nan() {
            return None;
        }
        // Integral floats come from id columns that had gaps upstream
        if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
            return Some(format!("{}", n as i64));
        }
    }
    Some(trimmed.to_string())
}

fn de_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(normalize_key))
}

/// Roster timestamp cells: `%Y-%m-%d %H:%M:%S`, empty when missing
pub mod timestamp_cell {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveDateTime::parse_from_str(text, FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
