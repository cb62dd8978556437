//! Application configuration for sourcemark.
//!
//! User config lives at `~/.sourcemark/sourcemark.toml`.
//! CLI flags override config file values, which override defaults.
//! SMTP credentials are never stored here — they come from the
//! environment (see the calibre crate).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SourcemarkError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sourcemark.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sourcemark";

// ---------------------------------------------------------------------------
// Config structs (matching sourcemark.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Annotation settings.
    #[serde(default)]
    pub annotate: AnnotateSection,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory where digest files are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Calibre recipe consumed by `ebook-convert`.
    #[serde(default = "default_recipe")]
    pub recipe: String,

    /// Prefix of the timestamped digest file name.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Whether to mail the finished digest.
    #[serde(default)]
    pub send_email: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            recipe: default_recipe(),
            file_prefix: default_file_prefix(),
            send_email: false,
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}
fn default_recipe() -> String {
    "digest.recipe".into()
}
fn default_file_prefix() -> String {
    "digest".into()
}

/// `[annotate]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotateSection {
    /// `rel` token that marks an article's provenance anchor.
    #[serde(default = "default_source_rel")]
    pub source_rel: String,

    /// Pixel width of one QR module.
    #[serde(default = "default_qr_module_pixels")]
    pub qr_module_pixels: u32,

    /// Whether the QR image carries a quiet-zone border.
    #[serde(default = "default_true")]
    pub qr_quiet_zone: bool,
}

impl Default for AnnotateSection {
    fn default() -> Self {
        Self {
            source_rel: default_source_rel(),
            qr_module_pixels: default_qr_module_pixels(),
            qr_quiet_zone: true,
        }
    }
}

fn default_source_rel() -> String {
    "calibre-downloaded-from".into()
}
fn default_qr_module_pixels() -> u32 {
    3
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Annotate config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime annotation configuration, passed into the transform entry point.
#[derive(Debug, Clone)]
pub struct AnnotateConfig {
    /// `rel` token identifying the downloaded-from anchor.
    pub source_rel: String,
    /// Pixel width of one QR module.
    pub qr_module_pixels: u32,
    /// Whether the QR image carries a quiet-zone border.
    pub qr_quiet_zone: bool,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            source_rel: default_source_rel(),
            qr_module_pixels: default_qr_module_pixels(),
            qr_quiet_zone: true,
        }
    }
}

impl From<&AppConfig> for AnnotateConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            source_rel: config.annotate.source_rel.clone(),
            qr_module_pixels: config.annotate.qr_module_pixels,
            qr_quiet_zone: config.annotate.qr_quiet_zone,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sourcemark/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SourcemarkError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sourcemark/sourcemark.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SourcemarkError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SourcemarkError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SourcemarkError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SourcemarkError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SourcemarkError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
