//! Article document discovery within an unpacked container.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use sourcemark_shared::{Result, SourcemarkError};

/// Extensions recognized as article content documents.
const ARTICLE_EXTENSIONS: [&str; 2] = ["html", "xhtml"];

/// Every article document under `root`, in deterministic lexical walk order.
///
/// Stylesheets, fonts, images, and package metadata are not article
/// documents and pass through the container untouched.
pub fn find_article_documents(root: &Path) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            SourcemarkError::io(path, e.into())
        })?;
        if entry.file_type().is_file() && is_article_document(entry.path()) {
            documents.push(entry.into_path());
        }
    }
    Ok(documents)
}

fn is_article_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ARTICLE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_markup_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("OEBPS").join("feed_0");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("article.xhtml"), "<html/>").unwrap();
        std::fs::write(dir.path().join("index.html"), "<html/>").unwrap();
        std::fs::write(dir.path().join("styles.css"), "body{}").unwrap();
        std::fs::write(dir.path().join("content.opf"), "<package/>").unwrap();
        std::fs::write(dir.path().join("cover.png"), [0u8; 4]).unwrap();

        let documents = find_article_documents(dir.path()).unwrap();
        let names: Vec<_> = documents
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names.len(), 2);
        assert!(names.contains(&"index.html".to_string()));
        assert!(names.iter().any(|n| n.ends_with("article.xhtml")));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(is_article_document(Path::new("a/PAGE.HTML")));
        assert!(is_article_document(Path::new("a/page.Xhtml")));
        assert!(!is_article_document(Path::new("a/page.htm.bak")));
        assert!(!is_article_document(Path::new("a/page")));
    }

    #[test]
    fn walk_order_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.html", "a.html", "b.html"] {
            std::fs::write(dir.path().join(name), "<html/>").unwrap();
        }

        let first = find_article_documents(dir.path()).unwrap();
        let second = find_article_documents(dir.path()).unwrap();
        assert_eq!(first, second);

        let names: Vec<_> = first
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.html", "b.html", "c.html"]);
    }
}
