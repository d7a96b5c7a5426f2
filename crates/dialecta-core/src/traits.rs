//! Core trait definitions for store backends and the clock.
//!
//! These async traits are the seams between the scheduling/linking logic
//! and the persistence layer; the `dialecta-store` crate implements them.
//! All fallible methods return [`StoreError`] so the engine can classify
//! failures without string matching.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{CardState, Lexeme, Review, SentenceLink, Session};

// ---------------------------------------------------------------------------
// Study store
// ---------------------------------------------------------------------------

/// Persistence for card states, reviews, and sessions.
#[async_trait]
pub trait StudyStore: Send + Sync {
    /// Fetch the card state for a learner × lexeme pair, if one exists.
    ///
    /// A missing state means "new card", not an error.
    async fn card_state(
        &self,
        learner: Uuid,
        lexeme: Uuid,
    ) -> Result<Option<CardState>, StoreError>;

    /// Insert or replace a card state.
    async fn put_card_state(&self, state: CardState) -> Result<(), StoreError>;

    /// All card states for a learner, optionally restricted to one dialect.
    async fn card_states(
        &self,
        learner: Uuid,
        dialect: Option<Uuid>,
    ) -> Result<Vec<CardState>, StoreError>;

    /// Append one immutable review record.
    async fn append_review(&self, review: Review) -> Result<(), StoreError>;

    /// Record a new session.
    async fn put_session(&self, session: Session) -> Result<(), StoreError>;

    /// Lexemes for which the learner has any post-test review with
    /// score <= 2.
    async fn failed_post_test_lexemes(&self, learner: Uuid) -> Result<HashSet<Uuid>, StoreError>;

    /// Card states the learner reviewed at or after `since`, most recent
    /// first, capped to `limit`.
    async fn recently_reviewed(
        &self,
        learner: Uuid,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CardState>, StoreError>;
}

// ---------------------------------------------------------------------------
// Lexicon
// ---------------------------------------------------------------------------

/// Read access to the per-dialect vocabulary.
#[async_trait]
pub trait Lexicon: Send + Sync {
    /// Exact lemma lookup within a dialect.
    async fn exact(&self, dialect: Uuid, lemma: &str) -> Result<Option<Lexeme>, StoreError>;

    /// Best fuzzy candidate for `query` within a dialect, with its
    /// similarity score in [0, 1].
    async fn best_match(
        &self,
        dialect: Uuid,
        query: &str,
    ) -> Result<Option<(Lexeme, f64)>, StoreError>;

    /// Lexemes ranked by descending similarity to `query`, optionally
    /// dialect-filtered.
    async fn search(
        &self,
        dialect: Option<Uuid>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<(Lexeme, f64)>, StoreError>;

    /// Most recently created lexemes, optionally dialect-filtered.
    async fn recent(&self, dialect: Option<Uuid>, limit: usize) -> Result<Vec<Lexeme>, StoreError>;

    /// Resolve lexemes by id. Unknown ids are skipped.
    async fn by_ids(&self, ids: &[Uuid]) -> Result<Vec<Lexeme>, StoreError>;
}

// ---------------------------------------------------------------------------
// Link store
// ---------------------------------------------------------------------------

/// Persistence for sentence-to-lexeme links.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Record a link. The (sentence, lexeme, start, end) quadruple is the
    /// identity: re-upserting an existing span is a no-op.
    async fn upsert_link(&self, link: SentenceLink) -> Result<(), StoreError>;

    /// All links recorded for a sentence.
    async fn links_for_sentence(&self, sentence: Uuid) -> Result<Vec<SentenceLink>, StoreError>;
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Injected time source. Core logic never reads global time directly.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
