//! In-memory store backend.
//!
//! The reference implementation of the store seams, used by tests and
//! local tooling. Data lives in process memory behind `RwLock`s; fuzzy
//! ranking reuses the core trigram similarity, the way a SQL backend
//! would lean on its trigram extension.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use dialecta_core::error::StoreError;
use dialecta_core::linker::{normalize, trigram_similarity};
use dialecta_core::model::{CardState, Lexeme, Review, SentenceLink, Session};
use dialecta_core::traits::{Lexicon, LinkStore, StudyStore};

/// HashMap-backed implementation of every store seam.
#[derive(Default)]
pub struct MemoryStore {
    cards: RwLock<HashMap<(Uuid, Uuid), CardState>>,
    reviews: RwLock<Vec<Review>>,
    sessions: RwLock<HashMap<Uuid, Session>>,
    lexemes: RwLock<HashMap<Uuid, Lexeme>>,
    links: RwLock<HashSet<SentenceLink>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a lexeme to the lexicon. Lemmas are unique per dialect.
    pub fn add_lexeme(&self, lexeme: Lexeme) -> Result<(), StoreError> {
        let mut lexemes = self.lexemes.write().unwrap();
        if lexemes
            .values()
            .any(|l| l.dialect == lexeme.dialect && l.lemma == lexeme.lemma)
        {
            return Err(StoreError::Conflict(format!(
                "lemma '{}' already exists in dialect {}",
                lexeme.lemma, lexeme.dialect
            )));
        }
        lexemes.insert(lexeme.id, lexeme);
        Ok(())
    }

    /// All reviews logged so far, oldest first.
    pub fn reviews(&self) -> Vec<Review> {
        self.reviews.read().unwrap().clone()
    }

    /// The session with the given id, if recorded.
    pub fn session(&self, id: Uuid) -> Option<Session> {
        self.sessions.read().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl StudyStore for MemoryStore {
    async fn card_state(
        &self,
        learner: Uuid,
        lexeme: Uuid,
    ) -> Result<Option<CardState>, StoreError> {
        Ok(self.cards.read().unwrap().get(&(learner, lexeme)).cloned())
    }

    async fn put_card_state(&self, state: CardState) -> Result<(), StoreError> {
        self.cards
            .write()
            .unwrap()
            .insert((state.learner, state.lexeme), state);
        Ok(())
    }

    async fn card_states(
        &self,
        learner: Uuid,
        dialect: Option<Uuid>,
    ) -> Result<Vec<CardState>, StoreError> {
        let lexemes = self.lexemes.read().unwrap();
        let states = self
            .cards
            .read()
            .unwrap()
            .values()
            .filter(|s| s.learner == learner)
            .filter(|s| match dialect {
                Some(d) => lexemes.get(&s.lexeme).is_some_and(|l| l.dialect == d),
                None => true,
            })
            .cloned()
            .collect();
        Ok(states)
    }

    async fn append_review(&self, review: Review) -> Result<(), StoreError> {
        self.reviews.write().unwrap().push(review);
        Ok(())
    }

    async fn put_session(&self, session: Session) -> Result<(), StoreError> {
        self.sessions.write().unwrap().insert(session.id, session);
        Ok(())
    }

    async fn failed_post_test_lexemes(&self, learner: Uuid) -> Result<HashSet<Uuid>, StoreError> {
        let failed = self
            .reviews
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.learner == learner && r.is_post_test && r.raw_score <= 2)
            .map(|r| r.lexeme)
            .collect();
        Ok(failed)
    }

    async fn recently_reviewed(
        &self,
        learner: Uuid,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CardState>, StoreError> {
        let mut recent: Vec<CardState> = self
            .cards
            .read()
            .unwrap()
            .values()
            .filter(|s| s.learner == learner)
            .filter(|s| s.last_review_at.is_some_and(|at| at >= since))
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.last_review_at.cmp(&a.last_review_at));
        recent.truncate(limit);
        Ok(recent)
    }
}

#[async_trait]
impl Lexicon for MemoryStore {
    async fn exact(&self, dialect: Uuid, lemma: &str) -> Result<Option<Lexeme>, StoreError> {
        Ok(self
            .lexemes
            .read()
            .unwrap()
            .values()
            .find(|l| l.dialect == dialect && l.lemma == lemma)
            .cloned())
    }

    async fn best_match(
        &self,
        dialect: Uuid,
        query: &str,
    ) -> Result<Option<(Lexeme, f64)>, StoreError> {
        Ok(self
            .lexemes
            .read()
            .unwrap()
            .values()
            .filter(|l| l.dialect == dialect)
            .map(|l| {
                let score = trigram_similarity(&normalize(&l.lemma), query);
                (l.clone(), score)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1)))
    }

    async fn search(
        &self,
        dialect: Option<Uuid>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<(Lexeme, f64)>, StoreError> {
        let needle = normalize(query);
        let mut hits: Vec<(Lexeme, f64)> = self
            .lexemes
            .read()
            .unwrap()
            .values()
            .filter(|l| dialect.is_none_or(|d| l.dialect == d))
            .map(|l| {
                let score = trigram_similarity(&normalize(&l.lemma), &needle);
                (l.clone(), score)
            })
            .collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn recent(&self, dialect: Option<Uuid>, limit: usize) -> Result<Vec<Lexeme>, StoreError> {
        let mut recent: Vec<Lexeme> = self
            .lexemes
            .read()
            .unwrap()
            .values()
            .filter(|l| dialect.is_none_or(|d| l.dialect == d))
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit);
        Ok(recent)
    }

    async fn by_ids(&self, ids: &[Uuid]) -> Result<Vec<Lexeme>, StoreError> {
        let lexemes = self.lexemes.read().unwrap();
        Ok(ids.iter().filter_map(|id| lexemes.get(id).cloned()).collect())
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn upsert_link(&self, link: SentenceLink) -> Result<(), StoreError> {
        self.links.write().unwrap().insert(link);
        Ok(())
    }

    async fn links_for_sentence(&self, sentence: Uuid) -> Result<Vec<SentenceLink>, StoreError> {
        let mut links: Vec<SentenceLink> = self
            .links
            .read()
            .unwrap()
            .iter()
            .filter(|l| l.sentence == sentence)
            .copied()
            .collect();
        links.sort_by_key(|l| (l.start, l.end));
        Ok(links)
    }
}
