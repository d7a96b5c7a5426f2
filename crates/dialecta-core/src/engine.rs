//! Central study engine orchestrator.
//!
//! Wires the quality mapper, scheduler, classifier, and linker to the
//! store seams. One engine instance serves all learners; card-state
//! read-modify-write is serialized per (learner, lexeme) pair.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::linker::LexicalLinker;
use crate::model::{Attempt, CardState, Lexeme, Priority, Review, SentenceLink, Session, SessionKind};
use crate::priority::{classify, is_overdue, rank, QueueEntry};
use crate::quality::map_quality;
use crate::scheduler::apply_review;
use crate::traits::{Clock, Lexicon, LinkStore, StudyStore};

/// Configuration for the study engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default study-queue length.
    pub queue_limit: usize,
    /// Default minimum fuzzy similarity for sentence links.
    pub link_tolerance: f64,
    /// Concurrent lexicon lookups per sentence.
    pub linker_parallelism: usize,
    /// Default dictionary-search result count.
    pub search_limit: usize,
    /// Maximum cards drawn into a post-test session.
    pub post_test_draw: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_limit: 20,
            link_tolerance: 0.85,
            linker_parallelism: 4,
            search_limit: 50,
            post_test_draw: 20,
        }
    }
}

/// Result of recording one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub review: Review,
    pub state: CardState,
}

/// A freshly created post-test session and the cards drawn into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostTestDraw {
    pub session: Session,
    pub lexemes: Vec<Lexeme>,
}

/// The central study engine.
pub struct StudyEngine {
    store: Arc<dyn StudyStore>,
    lexicon: Arc<dyn Lexicon>,
    links: Arc<dyn LinkStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    /// One lock per (learner, lexeme) pair, created on first use.
    card_locks: Mutex<HashMap<(Uuid, Uuid), Arc<Mutex<()>>>>,
}

impl StudyEngine {
    pub fn new(
        store: Arc<dyn StudyStore>,
        lexicon: Arc<dyn Lexicon>,
        links: Arc<dyn LinkStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            lexicon,
            links,
            clock,
            config,
            card_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Grade an attempt, advance the card's schedule, and log the review.
    ///
    /// Concurrent submissions for the same (learner, lexeme) pair are
    /// serialized so no update is lost; different pairs proceed
    /// independently. Storage failures abort the operation and propagate
    /// unchanged.
    pub async fn record_attempt(
        &self,
        learner: Uuid,
        lexeme: Uuid,
        attempt: Attempt,
        session: Option<Uuid>,
    ) -> Result<AttemptOutcome> {
        let lock = self.card_lock(learner, lexeme).await;
        let _guard = lock.lock().await;

        let now = self.clock.now();
        let state = self
            .store
            .card_state(learner, lexeme)
            .await?
            .unwrap_or_else(|| CardState::new(learner, lexeme));

        let quality = map_quality(&attempt);
        let updated = apply_review(&state, quality, attempt.is_post_test, now);
        self.store.put_card_state(updated.clone()).await?;

        let review = Review {
            id: Uuid::new_v4(),
            learner,
            lexeme,
            session,
            mode: attempt.mode,
            raw_score: attempt.raw_score,
            similarity: attempt.similarity,
            quality,
            is_post_test: attempt.is_post_test,
            created_at: now,
        };
        self.store.append_review(review.clone()).await?;

        tracing::debug!(
            %learner,
            %lexeme,
            quality,
            interval_days = updated.interval_days,
            bucket = updated.priority.rank(),
            "attempt recorded"
        );

        Ok(AttemptOutcome {
            review,
            state: updated,
        })
    }

    /// Rank a learner's cards into an ordered study queue.
    ///
    /// Priorities are recomputed from current state on every call; the
    /// read takes no locks and tolerates slightly stale data. A learner
    /// with nothing ranked yet gets the most recently added vocabulary
    /// instead of an empty session.
    pub async fn build_study_queue(
        &self,
        learner: Uuid,
        dialect: Option<Uuid>,
        limit: Option<usize>,
    ) -> Result<Vec<QueueEntry>> {
        let limit = limit.unwrap_or(self.config.queue_limit);
        let now = self.clock.now();

        let states = self.store.card_states(learner, dialect).await?;
        let failed = self.store.failed_post_test_lexemes(learner).await?;

        let ids: Vec<Uuid> = states.iter().map(|s| s.lexeme).collect();
        let lexemes: HashMap<Uuid, Lexeme> = self
            .lexicon
            .by_ids(&ids)
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();

        let mut entries = Vec::with_capacity(states.len());
        for state in states {
            let Some(lexeme) = lexemes.get(&state.lexeme) else {
                tracing::warn!(lexeme = %state.lexeme, "card state without lexicon entry, skipping");
                continue;
            };
            entries.push(QueueEntry {
                lexeme: lexeme.clone(),
                priority: classify(
                    failed.contains(&state.lexeme),
                    state.ease_factor,
                    is_overdue(state.next_review_at, now),
                ),
                next_review_at: state.next_review_at,
                ease_factor: Some(state.ease_factor),
            });
        }

        let ranked = rank(entries, limit);
        if !ranked.is_empty() {
            return Ok(ranked);
        }

        let fresh = self.lexicon.recent(dialect, limit).await?;
        Ok(fresh
            .into_iter()
            .map(|lexeme| QueueEntry {
                lexeme,
                priority: Priority::Scheduled,
                next_review_at: None,
                ease_factor: None,
            })
            .collect())
    }

    /// Link a sentence's tokens to lexicon entries and persist the spans.
    ///
    /// Idempotent: re-linking the same sentence upserts the same spans. A
    /// failure while persisting aborts the remaining links; spans already
    /// written stay.
    pub async fn link_sentence(
        &self,
        sentence: Uuid,
        dialect: Uuid,
        text: &str,
        tolerance: Option<f64>,
    ) -> Result<Vec<SentenceLink>> {
        let linker = LexicalLinker::new(
            tolerance.unwrap_or(self.config.link_tolerance),
            self.config.linker_parallelism,
        );
        let links = linker
            .link(self.lexicon.as_ref(), sentence, dialect, text)
            .await?;
        for link in &links {
            self.links.upsert_link(*link).await?;
        }
        tracing::debug!(%sentence, links = links.len(), "sentence linked");
        Ok(links)
    }

    /// Open a post-test session and draw the cards reviewed since
    /// midnight UTC, most recent first.
    pub async fn start_post_test(&self, learner: Uuid) -> Result<PostTestDraw> {
        let now = self.clock.now();
        let session = Session {
            id: Uuid::new_v4(),
            learner,
            kind: SessionKind::PostTest,
            created_at: now,
        };
        self.store.put_session(session.clone()).await?;

        let since = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let recent = self
            .store
            .recently_reviewed(learner, since, self.config.post_test_draw)
            .await?;

        let ids: Vec<Uuid> = recent.iter().map(|s| s.lexeme).collect();
        let mut by_id: HashMap<Uuid, Lexeme> = self
            .lexicon
            .by_ids(&ids)
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();
        // Keep the draw order; by_ids gives no ordering guarantee.
        let lexemes = ids.iter().filter_map(|id| by_id.remove(id)).collect();

        Ok(PostTestDraw { session, lexemes })
    }

    /// Similarity-ranked dictionary search. Empty queries return nothing.
    pub async fn search_lexicon(
        &self,
        query: &str,
        dialect: Option<Uuid>,
        limit: Option<usize>,
    ) -> Result<Vec<(Lexeme, f64)>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let hits = self
            .lexicon
            .search(dialect, query, limit.unwrap_or(self.config.search_limit))
            .await?;
        Ok(hits)
    }

    async fn card_lock(&self, learner: Uuid, lexeme: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.card_locks.lock().await;
        locks.entry((learner, lexeme)).or_default().clone()
    }
}
