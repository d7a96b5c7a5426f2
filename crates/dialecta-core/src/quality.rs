//! Mapping raw attempts to discrete 0-5 quality grades.
//!
//! The grade feeds the SM-2 scheduler. Mapping is total: every attempt
//! grades to something, there is no error path.

use crate::model::{Attempt, ReviewMode};

/// Map a raw attempt to a 0-5 recall-quality grade.
///
/// - Choice is graded coarsely: a perfect raw score is a 5, anything else
///   a 3.
/// - Spell is graded on answer similarity: 100 -> 5, 85+ -> 4, 70+ -> 3,
///   below -> 2. A missing similarity counts as 0.
/// - Mixed always grades 3.
pub fn map_quality(attempt: &Attempt) -> u8 {
    match attempt.mode {
        ReviewMode::Choice => {
            if attempt.raw_score == 4 {
                5
            } else {
                3
            }
        }
        ReviewMode::Spell => match attempt.similarity.unwrap_or(0) {
            100.. => 5,
            85..=99 => 4,
            70..=84 => 3,
            _ => 2,
        },
        ReviewMode::Mixed => 3,
    }
}
