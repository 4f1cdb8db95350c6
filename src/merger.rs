// 🔗 Merger - primary emails joined to constituent and subscription data
// Both joins are left joins: an email row is never dropped for lack of a match

use crate::records::{ConstituentRecord, EmailRecord, MergedEmailRow, SubscriptionRecord};
use std::collections::HashMap;
use tracing::{debug, info};

/// Keep only rows flagged primary, in source order
pub fn primary_emails(emails: &[EmailRecord]) -> Vec<EmailRecord> {
    emails.iter().filter(|e| e.is_primary()).cloned().collect()
}

/// Left-join creation/modification timestamps and source code by `cons_id`
///
/// Unmatched or null ids yield empty metadata. A constituent id that appears
/// more than once fans the email row out once per match.
pub fn join_constituents(
    primary: Vec<EmailRecord>,
    constituents: &[ConstituentRecord],
) -> Vec<MergedEmailRow> {
    let index = index_by(constituents, |c| c.cons_id.as_deref());
    let mut merged = Vec::with_capacity(primary.len());

    for email in primary {
        let base = MergedEmailRow {
            email: email.email,
            cons_email_id: email.cons_email_id,
            cons_id: email.cons_id,
            ..MergedEmailRow::default()
        };

        let matches = base.cons_id.as_deref().and_then(|id| index.get(id));
        match matches {
            Some(found) => {
                for constituent in found {
                    merged.push(MergedEmailRow {
                        create_dt: constituent.create_dt.clone(),
                        modified_dt: constituent.modified_dt.clone(),
                        source: constituent.source.clone(),
                        ..base.clone()
                    });
                }
            }
            None => merged.push(base),
        }
    }

    merged
}

/// Left-join the chapter-1 unsubscribe flag by `cons_email_id`
pub fn join_subscriptions(
    rows: Vec<MergedEmailRow>,
    subscriptions: &[SubscriptionRecord],
) -> Vec<MergedEmailRow> {
    let in_scope: Vec<SubscriptionRecord> = subscriptions
        .iter()
        .filter(|s| s.in_chapter_scope())
        .cloned()
        .collect();
    debug!(
        chapter_rows = in_scope.len(),
        total_rows = subscriptions.len(),
        "filtered subscriptions to chapter {}",
        SubscriptionRecord::CHAPTER
    );

    let index = index_by(&in_scope, |s| s.cons_email_id.as_deref());

    let mut merged = Vec::with_capacity(rows.len());
    for row in rows {
        let matches = row.cons_email_id.as_deref().and_then(|id| index.get(id));
        match matches {
            Some(found) => {
                for sub in found {
                    merged.push(MergedEmailRow {
                        isunsub: sub.isunsub.clone(),
                        ..row.clone()
                    });
                }
            }
            None => merged.push(row),
        }
    }

    merged
}

/// Full merge stage: primary filter, constituent join, subscription join
///
/// An empty result means no primary emails existed.
pub fn merge(
    emails: &[EmailRecord],
    constituents: &[ConstituentRecord],
    subscriptions: &[SubscriptionRecord],
) -> Vec<MergedEmailRow> {
    let primary = primary_emails(emails);
    info!(primary = primary.len(), total = emails.len(), "selected primary emails");

    if primary.is_empty() {
        return Vec::new();
    }

    let with_constituents = join_constituents(primary, constituents);
    let merged = join_subscriptions(with_constituents, subscriptions);
    info!(rows = merged.len(), "merged constituent and subscription data");
    merged
}

fn index_by<'a, T, F>(rows: &'a [T], key: F) -> HashMap<&'a str, Vec<&'a T>>
where
    F: Fn(&'a T) -> Option<&'a str>,
{
    let mut index: HashMap<&'a str, Vec<&'a T>> = HashMap::new();
    for row in rows {
        if let Some(k) = key(row) {
            index.entry(k).or_default().push(row);
        }
    }
    index
}

// ============================================================================
// TESTS
// ============================================================================
