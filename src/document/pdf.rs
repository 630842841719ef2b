//! Page-level text extraction backed by `lopdf`.

use super::{DocumentError, Page};
use lopdf::Document;
use std::path::{Path, PathBuf};

/// Load `path` and return the text of every page that has any.
///
/// Parsing is CPU-bound and runs on the blocking pool. Pages are returned in document order
/// with zero-based numbers; pages without extractable text are skipped.
pub async fn load_pages(path: &Path) -> Result<Vec<Page>, DocumentError> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_pages(&path)).await?
}

fn extract_pages(path: &Path) -> Result<Vec<Page>, DocumentError> {
    if !path.is_file() {
        return Err(DocumentError::Unreadable(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a file", path.display()),
        )));
    }

    let document = Document::load(path)?;
    if document.is_encrypted() {
        return Err(DocumentError::Encrypted);
    }

    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    let mut pages = Vec::with_capacity(page_numbers.len());
    for number in page_numbers {
        let text = match document.extract_text(&[number]) {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(page = number, error = %error, "Skipping page without extractable text");
                continue;
            }
        };
        if text.trim().is_empty() {
            tracing::debug!(page = number, "Skipping empty page");
            continue;
        }
        pages.push(Page {
            number: number.saturating_sub(1),
            text,
        });
    }

    tracing::debug!(path = %path.display(), pages = pages.len(), "Extracted PDF text");
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures::pdf_bytes;
    use tempfile::TempDir;

    #[tokio::test]
    async fn pages_are_numbered_from_zero() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("two-pages.pdf");
        std::fs::write(&path, pdf_bytes(&["Rust ownership rules", "Borrowing and lifetimes"]))
            .expect("write pdf");

        let pages = load_pages(&path).await.expect("pages");

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 0);
        assert!(pages[0].text.contains("Rust ownership rules"));
        assert_eq!(pages[1].number, 1);
        assert!(pages[1].text.contains("Borrowing and lifetimes"));
    }

    #[tokio::test]
    async fn blank_pages_are_skipped() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("blank-middle.pdf");
        std::fs::write(&path, pdf_bytes(&["first", "", "third"])).expect("write pdf");

        let pages = load_pages(&path).await.expect("pages");

        let numbers: Vec<u32> = pages.iter().map(|page| page.number).collect();
        assert_eq!(numbers, vec![0, 2]);
    }

    #[tokio::test]
    async fn non_pdf_bytes_are_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"just some text, not a pdf").expect("write");

        let error = load_pages(&path).await.unwrap_err();

        assert!(matches!(error, DocumentError::Corrupt(_)));
    }

    #[tokio::test]
    async fn missing_file_is_unreadable() {
        let dir = TempDir::new().expect("tempdir");
        let error = load_pages(&dir.path().join("absent.pdf")).await.unwrap_err();

        assert!(matches!(error, DocumentError::Unreadable(_)));
    }
}
