//! dialecta-store — store backends, caching, clocks, and configuration.
//!
//! Implements the store traits from `dialecta-core`: an in-memory
//! reference backend, a TTL-cached lexicon decorator, clock sources, and
//! TOML configuration loading.

pub mod cache;
pub mod clock;
pub mod config;
pub mod memory;

pub use cache::{CachedLexicon, TtlCache};
pub use clock::{ManualClock, SystemClock};
pub use config::{load_config, load_config_from, DialectaConfig};
pub use memory::MemoryStore;
