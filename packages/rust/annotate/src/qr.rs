//! QR artifact synthesis and naming.

use std::io::Cursor;
use std::path::Path;

use image::Luma;
use qrcode::QrCode;

use sourcemark_shared::{AnnotateConfig, Result, SourcemarkError};

/// Visual options for rendered QR artifacts.
#[derive(Debug, Clone, Copy)]
pub struct QrOptions {
    /// Pixel width of one QR module.
    pub module_pixels: u32,
    /// Whether to surround the code with a quiet-zone border.
    pub quiet_zone: bool,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            module_pixels: 3,
            quiet_zone: true,
        }
    }
}

impl From<&AnnotateConfig> for QrOptions {
    fn from(config: &AnnotateConfig) -> Self {
        Self {
            // A zero-width module renders nothing scannable.
            module_pixels: config.qr_module_pixels.max(1),
            quiet_zone: config.qr_quiet_zone,
        }
    }
}

/// Render `url` as PNG-encoded QR raster bytes.
///
/// Output is deterministic for a given URL and options.
pub fn render_png(url: &str, options: QrOptions) -> Result<Vec<u8>> {
    let code = QrCode::new(url.as_bytes())
        .map_err(|e| SourcemarkError::Qr(format!("cannot encode {url}: {e}")))?;
    let raster = code
        .render::<Luma<u8>>()
        .module_dimensions(options.module_pixels, options.module_pixels)
        .quiet_zone(options.quiet_zone)
        .build();

    let mut bytes = Vec::new();
    raster
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| SourcemarkError::Qr(format!("cannot encode PNG for {url}: {e}")))?;
    Ok(bytes)
}

/// Artifact file name for the document at `relative` (its path within the
/// container).
///
/// The whole relative path feeds the name, so documents sharing a base name
/// in different directories get distinct artifacts. Repeated runs produce
/// the same name and overwrite rather than accumulate.
pub fn artifact_file_name(relative: &Path) -> String {
    let stem = relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("_");
    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("qr_{stem}.png")
}
