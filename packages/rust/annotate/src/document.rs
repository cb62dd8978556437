//! Per-document annotation: URL resolution, markup mutation, serialization.

use std::fs;
use std::path::{Path, PathBuf};

use scraper::{Html, Selector};
use tracing::debug;

use sourcemark_shared::{AnnotateConfig, Result, SourcemarkError};

use crate::qr::{self, QrOptions};

/// Accessible alt text carried by every injected QR image.
pub const QR_ALT_TEXT: &str = "QR to article URL";

/// What happened to one article document.
#[derive(Debug)]
pub enum Outcome {
    /// Source paragraph and QR image appended; artifact written.
    Annotated {
        /// Path of the QR artifact on disk.
        artifact: PathBuf,
    },
    /// No downloaded-from anchor; document untouched, no artifact.
    NoSourceUrl,
    /// Artifact written but the document has no body to mutate.
    NoBody {
        /// Path of the already-written QR artifact.
        artifact: PathBuf,
    },
}

/// Annotate the document at `path` in place.
///
/// `scratch_root` anchors the artifact naming. The artifact is written next
/// to the document before the markup referencing it is rewritten, so the
/// reference never dangles.
pub fn annotate_document(
    path: &Path,
    scratch_root: &Path,
    config: &AnnotateConfig,
) -> Result<Outcome> {
    let source = fs::read_to_string(path).map_err(|e| SourcemarkError::io(path, e))?;
    let doc = Html::parse_document(&source);

    let Some(url) = source_url(&doc, &config.source_rel) else {
        return Ok(Outcome::NoSourceUrl);
    };
    debug!(document = %path.display(), url = %url, "resolved source url");

    let relative = path.strip_prefix(scratch_root).unwrap_or(path);
    let file_name = qr::artifact_file_name(relative);
    let png = qr::render_png(&url, QrOptions::from(config))?;
    let artifact = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(&file_name);
    fs::write(&artifact, &png).map_err(|e| SourcemarkError::io(&artifact, e))?;

    let Some(markup) = append_annotation(&doc, &url, &file_name) else {
        return Ok(Outcome::NoBody { artifact });
    };

    let mut rewritten = String::from(document_prologue(&source));
    rewritten.push_str(&markup);
    fs::write(path, rewritten).map_err(|e| SourcemarkError::io(path, e))?;

    Ok(Outcome::Annotated { artifact })
}

/// First anchor whose `rel` tokens include `marker` and which carries an
/// `href`. `rel` is a space-separated token list in HTML, so the marker is
/// matched as a token, not as the whole attribute value.
pub(crate) fn source_url(doc: &Html, marker: &str) -> Option<String> {
    let anchors = Selector::parse("a[href]").expect("valid selector");
    doc.select(&anchors)
        .find(|a| {
            a.value().attr("rel").is_some_and(|rel| {
                rel.split_ascii_whitespace().any(|token| token == marker)
            })
        })
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

/// Serialize the document with the source paragraph and QR image appended
/// as the last two body children.
///
/// Returns `None` when the document has no `body` element. The serializer
/// emits explicit lowercase end tags and entity-escapes text and attribute
/// values, so the final `</body>` in its output is the real one.
pub(crate) fn append_annotation(doc: &Html, url: &str, qr_src: &str) -> Option<String> {
    let body = Selector::parse("body").expect("valid selector");
    doc.select(&body).next()?;

    let serialized = doc.root_element().html();
    let insert_at = serialized.rfind("</body>")?;

    let snippet = format!(
        r#"<p><b><u>Source</u></b>: <a href="{href}">{text}</a></p><img src="{src}" alt="{alt}">"#,
        href = escape_attr(url),
        text = escape_text(url),
        src = escape_attr(qr_src),
        alt = QR_ALT_TEXT,
    );

    let mut out = String::with_capacity(serialized.len() + snippet.len());
    out.push_str(&serialized[..insert_at]);
    out.push_str(&snippet);
    out.push_str(&serialized[insert_at..]);
    Some(out)
}

/// Any XML declaration or doctype prologue the source carried before its
/// root element; serialization keeps it in front of the rewritten markup.
fn document_prologue(source: &str) -> &str {
    let lower = source.to_ascii_lowercase();
    if let Some(idx) = lower.find("<html") {
        return &source[..idx];
    }
    // No explicit root tag: keep any leading declarations before the first
    // element tag.
    let bytes = source.as_bytes();
    let mut from = 0;
    while let Some(offset) = source[from..].find('<') {
        let at = from + offset;
        match bytes.get(at + 1) {
            Some(b) if b.is_ascii_alphabetic() => return &source[..at],
            _ => from = at + 1,
        }
    }
    ""
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
