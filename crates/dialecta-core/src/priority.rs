//! The authoritative priority classifier and study-queue ordering.
//!
//! Every call site derives buckets through [`classify`]; the scheduler and
//! the queue builder must never grow their own copies of the formula.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Lexeme, Priority};

/// Ease factor at or below which a card counts as struggling.
pub const STRUGGLING_EASE_CEILING: f64 = 1.6;

/// Derive the priority bucket for a card.
///
/// A failed post-test beats everything; a struggling ease factor beats
/// being overdue; everything else is on schedule.
pub fn classify(failed_post_test: bool, ease_factor: f64, overdue: bool) -> Priority {
    if failed_post_test {
        Priority::FailedPostTest
    } else if ease_factor <= STRUGGLING_EASE_CEILING {
        Priority::Struggling
    } else if overdue {
        Priority::Overdue
    } else {
        Priority::Scheduled
    }
}

/// Whether a card's scheduled review time has passed.
///
/// Cards that were never reviewed have no due date and are not overdue.
pub fn is_overdue(next_review_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    next_review_at.is_some_and(|due| now > due)
}

/// One ranked position in a learner's study queue.
///
/// `next_review_at` and `ease_factor` are `None` for "new" entries that
/// have no card state yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub lexeme: Lexeme,
    pub priority: Priority,
    pub next_review_at: Option<DateTime<Utc>>,
    pub ease_factor: Option<f64>,
}

/// Order entries by (priority, due date, ease) and cap to `limit`.
///
/// Due date and ease sort ascending with missing values last, so the most
/// urgent, hardest cards surface first.
pub fn rank(mut entries: Vec<QueueEntry>, limit: usize) -> Vec<QueueEntry> {
    entries.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| nulls_last(a.next_review_at, b.next_review_at, DateTime::cmp))
            .then_with(|| nulls_last(a.ease_factor, b.ease_factor, |x, y| x.total_cmp(y)))
    });
    entries.truncate(limit);
    entries
}

fn nulls_last<T, F>(a: Option<T>, b: Option<T>, cmp: F) -> Ordering
where
    F: Fn(&T, &T) -> Ordering,
{
    match (&a, &b) {
        (Some(x), Some(y)) => cmp(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
