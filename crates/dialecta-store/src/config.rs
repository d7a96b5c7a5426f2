//! Configuration loading.
//!
//! Tunables for the engine and the lexicon cache, read from a TOML file
//! with serde defaults, then overridden from the environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use dialecta_core::engine::EngineConfig;

/// Top-level dialecta configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialectaConfig {
    /// Default study-queue length.
    #[serde(default = "default_queue_limit")]
    pub queue_limit: usize,
    /// Minimum fuzzy similarity for sentence links.
    #[serde(default = "default_link_tolerance")]
    pub link_tolerance: f64,
    /// Concurrent lexicon lookups per sentence.
    #[serde(default = "default_linker_parallelism")]
    pub linker_parallelism: usize,
    /// Default dictionary-search result count.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// Maximum cards drawn into a post-test session.
    #[serde(default = "default_post_test_draw")]
    pub post_test_draw: usize,
    /// How long cached lexicon reads stay live, in seconds.
    #[serde(default = "default_lexicon_cache_ttl_secs")]
    pub lexicon_cache_ttl_secs: u64,
}

fn default_queue_limit() -> usize {
    20
}
fn default_link_tolerance() -> f64 {
    0.85
}
fn default_linker_parallelism() -> usize {
    4
}
fn default_search_limit() -> usize {
    50
}
fn default_post_test_draw() -> usize {
    20
}
fn default_lexicon_cache_ttl_secs() -> u64 {
    600
}

impl Default for DialectaConfig {
    fn default() -> Self {
        Self {
            queue_limit: default_queue_limit(),
            link_tolerance: default_link_tolerance(),
            linker_parallelism: default_linker_parallelism(),
            search_limit: default_search_limit(),
            post_test_draw: default_post_test_draw(),
            lexicon_cache_ttl_secs: default_lexicon_cache_ttl_secs(),
        }
    }
}

impl DialectaConfig {
    /// Project into the engine's own config struct.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            queue_limit: self.queue_limit,
            link_tolerance: self.link_tolerance,
            linker_parallelism: self.linker_parallelism,
            search_limit: self.search_limit,
            post_test_draw: self.post_test_draw,
        }
    }

    /// Lexicon cache TTL as a duration.
    pub fn lexicon_cache_ttl(&self) -> Duration {
        Duration::seconds(self.lexicon_cache_ttl_secs as i64)
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `dialecta.toml` in the current directory
/// 2. `~/.config/dialecta/config.toml`
///
/// Environment variable overrides: `DIALECTA_QUEUE_LIMIT`,
/// `DIALECTA_LINK_TOLERANCE`.
pub fn load_config() -> Result<DialectaConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<DialectaConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("dialecta.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            global.exists().then_some(global)
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<DialectaConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => DialectaConfig::default(),
    };

    // Apply env var overrides
    if let Ok(limit) = std::env::var("DIALECTA_QUEUE_LIMIT") {
        config.queue_limit = limit
            .parse()
            .context("DIALECTA_QUEUE_LIMIT is not a number")?;
    }
    if let Ok(tolerance) = std::env::var("DIALECTA_LINK_TOLERANCE") {
        config.link_tolerance = tolerance
            .parse()
            .context("DIALECTA_LINK_TOLERANCE is not a number")?;
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("dialecta"))
}
