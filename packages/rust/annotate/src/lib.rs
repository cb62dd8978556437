//! EPUB source-link annotation.
//!
//! The transform unpacks a zip container, finds each article's
//! downloaded-from anchor, writes a QR artifact for the URL next to the
//! article, appends a visible "Source" paragraph plus the QR image to the
//! article body, and repacks the container in place.

pub mod document;
pub mod locator;
pub mod qr;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use sourcemark_shared::{AnnotateConfig, Result};

pub use document::{Outcome, QR_ALT_TEXT};

// ---------------------------------------------------------------------------
// AnnotateReport
// ---------------------------------------------------------------------------

/// Summary of one annotation run.
#[derive(Debug)]
pub struct AnnotateReport {
    /// Article documents found in the container.
    pub documents: usize,
    /// Documents that received a source paragraph and QR image.
    pub annotated: usize,
    /// Documents skipped (no downloaded-from anchor, or no body).
    pub skipped: usize,
    /// Per-document failures (document path, error message).
    pub errors: Vec<(PathBuf, String)>,
    /// Total transform duration.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Annotator
// ---------------------------------------------------------------------------

/// The EPUB annotation transform.
pub struct Annotator {
    config: AnnotateConfig,
}

impl Annotator {
    /// Create an annotator with the given configuration.
    pub fn new(config: AnnotateConfig) -> Self {
        Self { config }
    }

    /// Annotate every article in the container at `epub`, in place.
    ///
    /// Individual document failures are collected in the report and do not
    /// abort the run; unpack and repack failures do. The original file is
    /// replaced only after the new archive is fully written, and the
    /// scratch tree is removed on every exit path.
    #[instrument(skip_all, fields(container = %epub.display()))]
    pub fn annotate(&self, epub: &Path) -> Result<AnnotateReport> {
        let start = Instant::now();

        let scratch = sourcemark_container::unpack(epub)?;
        let documents = locator::find_article_documents(scratch.path())?;

        let mut annotated = 0usize;
        let mut skipped = 0usize;
        let mut errors: Vec<(PathBuf, String)> = Vec::new();

        for doc in &documents {
            match document::annotate_document(doc, scratch.path(), &self.config) {
                Ok(Outcome::Annotated { .. }) => annotated += 1,
                Ok(Outcome::NoSourceUrl) => {
                    skipped += 1;
                    info!(document = %doc.display(), "no downloaded-from anchor, skipping");
                }
                Ok(Outcome::NoBody { .. }) => {
                    skipped += 1;
                    warn!(document = %doc.display(), "document has no body, markup left untouched");
                }
                Err(e) => {
                    warn!(document = %doc.display(), error = %e, "annotation failed, continuing");
                    errors.push((doc.clone(), e.to_string()));
                }
            }
        }

        sourcemark_container::repack(scratch.path(), epub)?;

        let report = AnnotateReport {
            documents: documents.len(),
            annotated,
            skipped,
            errors,
            elapsed: start.elapsed(),
        };

        info!(
            documents = report.documents,
            annotated = report.annotated,
            skipped = report.skipped,
            errors = report.errors.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "annotation complete"
        );

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs::File;
    use std::io::{Read, Write};

    use scraper::{Html, Selector};
    use zip::write::SimpleFileOptions;

    const ANCHORED: &str = r#"<html><body>
<h1>Test Article</h1>
<a rel="calibre-downloaded-from" href="https://example.com/a">Source</a>
<p>Some content</p>
</body></html>"#;

    const PLAIN: &str = r#"<html><body><h1>No provenance</h1><p>text</p></body></html>"#;

    fn write_epub(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, bytes) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }

    fn read_epub(path: &Path) -> BTreeMap<String, Vec<u8>> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut out = BTreeMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf).unwrap();
            out.insert(entry.name().to_string(), buf);
        }
        out
    }

    fn annotator() -> Annotator {
        Annotator::new(AnnotateConfig::default())
    }

    #[test]
    fn annotates_document_with_source_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let epub = dir.path().join("test.epub");
        write_epub(&epub, &[("index.html", ANCHORED.as_bytes())]);

        let report = annotator().annotate(&epub).unwrap();
        assert_eq!(report.documents, 1);
        assert_eq!(report.annotated, 1);
        assert!(report.errors.is_empty());

        let entries = read_epub(&epub);
        assert_eq!(entries.len(), 2);

        let png_names: Vec<_> = entries
            .keys()
            .filter(|k| k.ends_with(".png"))
            .cloned()
            .collect();
        assert_eq!(png_names, ["qr_index.png"]);
        assert!(entries["qr_index.png"].starts_with(b"\x89PNG\r\n\x1a\n"));

        let html = String::from_utf8(entries["index.html"].clone()).unwrap();
        let doc = Html::parse_document(&html);
        let body = doc
            .select(&Selector::parse("body").unwrap())
            .next()
            .unwrap();
        let children: Vec<_> = body
            .children()
            .filter_map(scraper::ElementRef::wrap)
            .collect();

        let img = children.last().unwrap();
        assert_eq!(img.value().name(), "img");
        assert_eq!(img.value().attr("alt"), Some(QR_ALT_TEXT));
        assert_eq!(img.value().attr("src"), Some("qr_index.png"));

        let para = children[children.len() - 2];
        assert_eq!(para.value().name(), "p");
        let label = para
            .select(&Selector::parse("b > u").unwrap())
            .next()
            .unwrap();
        assert_eq!(label.text().collect::<String>(), "Source");
        let link = para
            .select(&Selector::parse("a[href]").unwrap())
            .next()
            .unwrap();
        assert_eq!(link.value().attr("href"), Some("https://example.com/a"));
        assert_eq!(link.text().collect::<String>(), "https://example.com/a");
    }

    #[test]
    fn skips_document_without_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let epub = dir.path().join("test.epub");
        write_epub(&epub, &[("index.html", PLAIN.as_bytes())]);

        let report = annotator().annotate(&epub).unwrap();
        assert_eq!(report.annotated, 0);
        assert_eq!(report.skipped, 1);

        let entries = read_epub(&epub);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["index.html"], PLAIN.as_bytes());
    }

    #[test]
    fn round_trip_preserves_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let epub = dir.path().join("test.epub");
        write_epub(
            &epub,
            &[
                ("mimetype", b"application/epub+zip"),
                ("OEBPS/content.opf", b"<package/>"),
                ("OEBPS/styles.css", b"body { margin: 0 }"),
                ("OEBPS/article.xhtml", ANCHORED.as_bytes()),
                ("OEBPS/about.xhtml", PLAIN.as_bytes()),
            ],
        );

        annotator().annotate(&epub).unwrap();

        let entries = read_epub(&epub);
        for name in [
            "mimetype",
            "OEBPS/content.opf",
            "OEBPS/styles.css",
            "OEBPS/article.xhtml",
            "OEBPS/about.xhtml",
        ] {
            assert!(entries.contains_key(name), "missing entry {name}");
        }
        // Pass-through entries keep their bytes.
        assert_eq!(entries["OEBPS/styles.css"], b"body { margin: 0 }");
        assert_eq!(entries["OEBPS/about.xhtml"], PLAIN.as_bytes());
        // One new artifact, next to its document.
        assert!(entries.contains_key("OEBPS/qr_OEBPS_article.png"));
        assert_eq!(entries.len(), 6);
    }

    #[test]
    fn distinct_artifacts_for_same_base_name() {
        let anchored_b: &str = r#"<html><body>
<a rel="calibre-downloaded-from" href="https://example.com/b">Source</a>
</body></html>"#;

        let dir = tempfile::tempdir().unwrap();
        let epub = dir.path().join("test.epub");
        write_epub(
            &epub,
            &[
                ("a/page.xhtml", ANCHORED.as_bytes()),
                ("b/page.xhtml", anchored_b.as_bytes()),
            ],
        );

        let report = annotator().annotate(&epub).unwrap();
        assert_eq!(report.annotated, 2);

        let entries = read_epub(&epub);
        let png_names: Vec<_> = entries
            .keys()
            .filter(|k| k.ends_with(".png"))
            .cloned()
            .collect();
        assert_eq!(png_names.len(), 2);
        assert!(entries.contains_key("a/qr_a_page.png"));
        assert!(entries.contains_key("b/qr_b_page.png"));
    }

    #[test]
    fn per_document_failure_does_not_abort_run() {
        let dir = tempfile::tempdir().unwrap();
        let epub = dir.path().join("test.epub");
        // Invalid UTF-8 makes one document unreadable as text.
        write_epub(
            &epub,
            &[
                ("bad.html", &[0xff, 0xfe, 0x80, 0x80]),
                ("index.html", ANCHORED.as_bytes()),
            ],
        );

        let report = annotator().annotate(&epub).unwrap();
        assert_eq!(report.documents, 2);
        assert_eq!(report.annotated, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].0.ends_with("bad.html"));

        // The failed document still rides through the repack untouched.
        let entries = read_epub(&epub);
        assert_eq!(entries["bad.html"], [0xffu8, 0xfe, 0x80, 0x80]);
        assert!(entries.contains_key("qr_index.png"));
    }

    #[test]
    fn custom_rel_marker_is_honored() {
        let custom: &str = r#"<html><body>
<a rel="saved-from" href="https://example.com/c">Source</a>
</body></html>"#;

        let dir = tempfile::tempdir().unwrap();
        let epub = dir.path().join("test.epub");
        write_epub(&epub, &[("index.html", custom.as_bytes())]);

        let config = AnnotateConfig {
            source_rel: "saved-from".into(),
            ..AnnotateConfig::default()
        };
        let report = Annotator::new(config).annotate(&epub).unwrap();
        assert_eq!(report.annotated, 1);

        // The default marker would have skipped it.
        write_epub(&epub, &[("index.html", custom.as_bytes())]);
        let report = annotator().annotate(&epub).unwrap();
        assert_eq!(report.annotated, 0);
    }

    #[test]
    fn invalid_container_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.epub");
        std::fs::write(&bogus, b"not a zip").unwrap();

        assert!(annotator().annotate(&bogus).is_err());
    }
}
