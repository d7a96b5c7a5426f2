//! SM-2 ease/interval update and next-review scheduling.
//!
//! Pure over an injected `now`: the engine supplies the grade and the
//! clock reading, then persists the returned state.

use chrono::{DateTime, Duration, Utc};

use crate::model::CardState;
use crate::priority::{classify, is_overdue};

/// Floor for the SM-2 ease factor.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Apply one graded review to a card's state.
///
/// Failed recall (quality < 3) resets the repetition streak and schedules
/// the card for tomorrow. Successful recall grows the interval along the
/// SM-2 curve: 1 day, 6 days, then interval × ease.
pub fn apply_review(
    state: &CardState,
    quality: u8,
    is_post_test: bool,
    now: DateTime<Utc>,
) -> CardState {
    let mut next = state.clone();

    if quality < 3 {
        next.repetitions = 0;
        next.interval_days = 1;
    } else {
        next.interval_days = match next.repetitions {
            0 => 1,
            1 => 6,
            _ => (next.interval_days as f64 * next.ease_factor).round() as u32,
        };
        next.repetitions += 1;
    }

    // Ease moves on every review, successful or not.
    let q = f64::from(quality.min(5));
    next.ease_factor += 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
    if next.ease_factor < MIN_EASE_FACTOR {
        next.ease_factor = MIN_EASE_FACTOR;
    }

    next.next_review_at = Some(now + Duration::days(i64::from(next.interval_days)));
    next.last_review_at = Some(now);

    // The overdue arm cannot fire here (the due date was just pushed into
    // the future); it exists for classifying other, stale cards.
    next.priority = classify(
        is_post_test && quality < 3,
        next.ease_factor,
        is_overdue(next.next_review_at, now),
    );

    next
}
