//! `ebook-convert` invocation: recipe → EPUB.

use std::ffi::OsString;
use std::path::PathBuf;

use tokio::process::Command;
use tracing::{debug, info};

use sourcemark_shared::{Result, SourcemarkError};

/// The external conversion binary, expected on `PATH`.
const EBOOK_CONVERT: &str = "ebook-convert";

/// One conversion: a calibre recipe in, an EPUB out.
#[derive(Debug, Clone)]
pub struct ConvertJob {
    /// Recipe file consumed by `ebook-convert`.
    pub recipe: PathBuf,
    /// EPUB path to produce.
    pub output: PathBuf,
}

impl ConvertJob {
    /// Argument vector passed to `ebook-convert`.
    pub fn args(&self) -> Vec<OsString> {
        vec![
            self.recipe.clone().into_os_string(),
            self.output.clone().into_os_string(),
        ]
    }
}

/// Build the EPUB described by `job`.
///
/// Fails if the binary cannot be launched or exits non-zero; the converter's
/// own output goes straight to the inherited stdio so recipe errors stay
/// visible.
pub async fn build_epub(job: &ConvertJob) -> Result<()> {
    if !job.recipe.exists() {
        return Err(SourcemarkError::Convert(format!(
            "recipe not found: {}",
            job.recipe.display()
        )));
    }

    info!(
        recipe = %job.recipe.display(),
        output = %job.output.display(),
        "running ebook-convert"
    );

    let status = Command::new(EBOOK_CONVERT)
        .args(job.args())
        .status()
        .await
        .map_err(|e| {
            SourcemarkError::Convert(format!("failed to launch {EBOOK_CONVERT}: {e}"))
        })?;

    if !status.success() {
        return Err(SourcemarkError::Convert(format!(
            "{EBOOK_CONVERT} exited with {status}"
        )));
    }

    debug!(output = %job.output.display(), "conversion finished");
    Ok(())
}

/// Version line of the installed converter, for run logs.
pub async fn ebook_convert_version() -> Result<String> {
    let output = Command::new(EBOOK_CONVERT)
        .arg("--version")
        .output()
        .await
        .map_err(|e| {
            SourcemarkError::Convert(format!("failed to launch {EBOOK_CONVERT}: {e}"))
        })?;

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
