//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), `AppPaths` for cross-platform
//! config directories, and TOML persistence via `AppConfig::load` /
//! `AppConfig::save`.  The conditioning and detector sections re-use the
//! config structs from [`crate::dsp`] so a settings file tunes the whole
//! pipeline in one place.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, AudioSettings, ConfigError};
