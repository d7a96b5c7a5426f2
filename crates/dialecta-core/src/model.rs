//! Core data model types for dialecta.
//!
//! These are the fundamental types the whole system uses to represent
//! learners' card state, graded attempts, vocabulary entries, and
//! sentence-to-lexeme links.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Spaced-repetition state for one learner × lexeme pair.
///
/// Created lazily on the first review and mutated only by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardState {
    /// The learner this state belongs to.
    pub learner: Uuid,
    /// The lexeme being learned.
    pub lexeme: Uuid,
    /// SM-2 ease factor. Never drops below 1.3.
    pub ease_factor: f64,
    /// Days until the next review. 0 until the card has been reviewed once.
    pub interval_days: u32,
    /// Consecutive successful recalls. Resets to 0 on any failed recall.
    pub repetitions: u32,
    /// When the card is next due, if it has been reviewed.
    pub next_review_at: Option<DateTime<Utc>>,
    /// When the card was last reviewed.
    pub last_review_at: Option<DateTime<Utc>>,
    /// Bucket computed at the last review. Informational only: queue
    /// building always recomputes priorities from current state.
    pub priority: Priority,
}

impl CardState {
    /// Fresh state for a card that has never been reviewed.
    pub fn new(learner: Uuid, lexeme: Uuid) -> Self {
        Self {
            learner,
            lexeme,
            ease_factor: 2.5,
            interval_days: 0,
            repetitions: 0,
            next_review_at: None,
            last_review_at: None,
            priority: Priority::Scheduled,
        }
    }
}

/// Study-priority bucket, 1 (most urgent) through 4.
///
/// Declaration order doubles as sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// A post-test review of this card failed (score <= 2).
    FailedPostTest,
    /// Ease factor at or below 1.6; the card is not sticking.
    Struggling,
    /// The scheduled review time has passed.
    Overdue,
    /// On schedule.
    Scheduled,
}

impl Priority {
    /// Numeric bucket, 1-4.
    pub fn rank(self) -> u8 {
        match self {
            Priority::FailedPostTest => 1,
            Priority::Struggling => 2,
            Priority::Overdue => 3,
            Priority::Scheduled => 4,
        }
    }
}

/// How an attempt was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewMode {
    /// Multiple choice.
    Choice,
    /// Typed answer, graded by string similarity.
    Spell,
    /// Mixed exercise.
    Mixed,
}

impl fmt::Display for ReviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewMode::Choice => write!(f, "CHOICE"),
            ReviewMode::Spell => write!(f, "SPELL"),
            ReviewMode::Mixed => write!(f, "MIXED"),
        }
    }
}

impl FromStr for ReviewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CHOICE" => Ok(ReviewMode::Choice),
            "SPELL" => Ok(ReviewMode::Spell),
            "MIXED" => Ok(ReviewMode::Mixed),
            other => Err(format!("unknown review mode: {other}")),
        }
    }
}

/// A single answer submitted by a learner, before grading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Attempt {
    pub mode: ReviewMode,
    /// Raw score from the exercise, 1-4.
    pub raw_score: u8,
    /// Percent similarity of the typed answer, 0-100. Spell mode only.
    #[serde(default)]
    pub similarity: Option<u8>,
    /// Whether this attempt belongs to a post-test session.
    #[serde(default)]
    pub is_post_test: bool,
}

/// Immutable log entry for one graded attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub learner: Uuid,
    pub lexeme: Uuid,
    /// Session this review was submitted in, if any.
    #[serde(default)]
    pub session: Option<Uuid>,
    pub mode: ReviewMode,
    pub raw_score: u8,
    #[serde(default)]
    pub similarity: Option<u8>,
    /// Derived 0-5 recall-quality grade.
    pub quality: u8,
    pub is_post_test: bool,
    pub created_at: DateTime<Utc>,
}

/// Groups reviews submitted together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub learner: Uuid,
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
}

/// Session type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionKind {
    /// Regular study.
    Normal,
    /// Stricter, later check distinguishing retention from recent exposure.
    PostTest,
}

/// A dialect-scoped vocabulary entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lexeme {
    pub id: Uuid,
    /// The dialect this entry belongs to. Lemmas are unique per dialect.
    pub dialect: Uuid,
    pub lemma: String,
    pub meaning: String,
    #[serde(default)]
    pub phonetic: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A resolved occurrence of a lexeme inside a sentence.
///
/// `start`/`end` are char offsets into the sentence text, `end` exclusive.
/// The quadruple is the identity: re-linking a sentence upserts, it never
/// duplicates spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SentenceLink {
    pub sentence: Uuid,
    pub lexeme: Uuid,
    pub start: usize,
    pub end: usize,
}
