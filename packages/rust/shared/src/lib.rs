//! Shared error model, configuration, and naming for sourcemark.
//!
//! This crate is the foundation depended on by all other sourcemark crates.
//! It provides:
//! - [`SourcemarkError`] — the unified error type
//! - Configuration ([`AppConfig`], [`AnnotateConfig`], config loading)
//! - Digest file naming ([`digest_file_name`])

pub mod config;
pub mod error;
pub mod naming;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnnotateConfig, AnnotateSection, AppConfig, DefaultsConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{Result, SourcemarkError};
pub use naming::digest_file_name;
