//! Lexical linking: tokenize sentence text and resolve each token against
//! a per-dialect lexicon, exact first, trigram-fuzzy as fallback.
//!
//! Spans are char offsets into the source text. Resolution runs as an
//! ordered bounded-concurrency stream, so long sentences don't pay one
//! round-trip per token while left-to-right span order is preserved.

use std::collections::BTreeSet;

use futures::stream::{self, StreamExt, TryStreamExt};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::SentenceLink;
use crate::traits::Lexicon;

/// Punctuation stripped from tokens during normalization.
const PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

/// A whitespace-delimited token and its char-offset span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Normalized token text (see [`normalize`]).
    pub text: String,
    /// Char offset of the first char of the raw token.
    pub start: usize,
    /// Char offset one past the last char of the raw token.
    pub end: usize,
}

/// Split text on whitespace, assigning each token its char-offset span in
/// one forward scan, so repeated tokens land on their own occurrences.
/// Tokens that normalize to nothing (pure punctuation) are dropped.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut raw = String::new();
    let mut start = 0usize;
    let mut pos = 0usize;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !raw.is_empty() {
                push_token(&mut tokens, &raw, start, pos);
                raw.clear();
            }
        } else {
            if raw.is_empty() {
                start = pos;
            }
            raw.push(ch);
        }
        pos += 1;
    }
    if !raw.is_empty() {
        push_token(&mut tokens, &raw, start, pos);
    }
    tokens
}

fn push_token(tokens: &mut Vec<Token>, raw: &str, start: usize, end: usize) {
    let text = normalize(raw);
    if !text.is_empty() {
        tokens.push(Token { text, start, end });
    }
}

/// Normalize a token: NFD-decompose, drop combining marks, lowercase,
/// strip the fixed punctuation set.
pub fn normalize(raw: &str) -> String {
    raw.nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| !PUNCTUATION.contains(c))
        .collect()
}

/// Trigram similarity between two words, pg_trgm style: each word is
/// padded with two leading and one trailing space, distinct 3-char
/// windows are collected, and the Jaccard ratio of the two sets is
/// returned. Identical non-empty words score 1.0.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let ta = trigrams(a);
    let tb = trigrams(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let shared = ta.intersection(&tb).count();
    let union = ta.len() + tb.len() - shared;
    shared as f64 / union as f64
}

fn trigrams(word: &str) -> BTreeSet<String> {
    let mut set = BTreeSet::new();
    if word.is_empty() {
        return set;
    }
    let padded: Vec<char> = "  "
        .chars()
        .chain(word.chars())
        .chain(" ".chars())
        .collect();
    for window in padded.windows(3) {
        set.insert(window.iter().collect());
    }
    set
}

/// Resolves sentence tokens to lexicon entries and emits positional spans.
#[derive(Debug, Clone)]
pub struct LexicalLinker {
    /// Minimum fuzzy similarity for a link, in [0, 1].
    pub tolerance: f64,
    /// Concurrent lexicon lookups per sentence.
    pub parallelism: usize,
}

impl Default for LexicalLinker {
    fn default() -> Self {
        Self {
            tolerance: 0.85,
            parallelism: 4,
        }
    }
}

impl LexicalLinker {
    pub fn new(tolerance: f64, parallelism: usize) -> Self {
        Self {
            tolerance,
            parallelism: parallelism.max(1),
        }
    }

    /// Resolve every token of `text` against the dialect's lexicon.
    ///
    /// An exact lemma hit wins immediately, even when a fuzzy candidate
    /// elsewhere would score higher; otherwise the best trigram candidate
    /// links iff its score reaches the tolerance. At most one link per
    /// token; unmatched tokens are silently skipped. The first lookup
    /// failure aborts the remaining tokens.
    pub async fn link(
        &self,
        lexicon: &dyn Lexicon,
        sentence: Uuid,
        dialect: Uuid,
        text: &str,
    ) -> Result<Vec<SentenceLink>, StoreError> {
        let tokens = tokenize(text);
        let resolved: Vec<Option<SentenceLink>> = stream::iter(tokens)
            .map(|token| async move {
                let lexeme = self.resolve(lexicon, dialect, &token.text).await?;
                Ok::<_, StoreError>(lexeme.map(|id| SentenceLink {
                    sentence,
                    lexeme: id,
                    start: token.start,
                    end: token.end,
                }))
            })
            .buffered(self.parallelism)
            .try_collect()
            .await?;
        Ok(resolved.into_iter().flatten().collect())
    }

    async fn resolve(
        &self,
        lexicon: &dyn Lexicon,
        dialect: Uuid,
        token: &str,
    ) -> Result<Option<Uuid>, StoreError> {
        if let Some(hit) = lexicon.exact(dialect, token).await? {
            return Ok(Some(hit.id));
        }
        match lexicon.best_match(dialect, token).await? {
            Some((lexeme, score)) if score >= self.tolerance => Ok(Some(lexeme.id)),
            _ => Ok(None),
        }
    }
}
