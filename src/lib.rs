// Constituent Roster - Core Library
// Joins constituent, email, and subscription extracts into a person-level
// email roster plus a daily acquisition aggregate

pub mod records;
pub mod loader;
pub mod merger;
pub mod normalizer;
pub mod aggregator;
pub mod writer;
pub mod pipeline;
pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use records::{
    ConstituentRecord, EmailRecord, SubscriptionRecord,
    MergedEmailRow, PersonEmailRow, AggregateRow,
    normalize_key, parse_flag,
};
pub use loader::{
    DataSource, FileSource, HttpSource, InlineSource, RawTable,
    source_for, load_table, load_records,
};
pub use merger::{merge, primary_emails, join_constituents, join_subscriptions};
pub use normalizer::{normalize, parse_timestamp, recode_unsub};
pub use aggregator::{aggregate, check_duplicates, AggregateOutcome, DuplicateEmailWarning};
pub use writer::{write_roster, write_aggregates, read_roster, read_aggregates, WrittenFile};
pub use pipeline::{Pipeline, RunSummary, Sources};
pub use config::{PipelineConfig, SourceLocations};
pub use error::{EtlError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
