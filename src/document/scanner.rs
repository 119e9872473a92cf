use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

use super::model::RawDocument;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to read directory {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Collapses every whitespace run to a single space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Text of an extraction task, or `None` when the PDF should be skipped.
/// A panic inside the extractor counts as an unreadable PDF; a cancelled
/// task is an error.
fn skip_unextractable<E: std::fmt::Display>(
    path: &str,
    extracted: Result<Result<String, E>, tokio::task::JoinError>,
) -> Result<Option<String>, ScanError> {
    match extracted {
        Ok(Ok(text)) => Ok(Some(text)),
        Ok(Err(e)) => {
            log::warn!("Skipping {}: PDF text extraction failed: {}", path, e);
            Ok(None)
        }
        Err(e) if e.is_panic() => {
            log::warn!("Skipping {}: PDF text extraction panicked", path);
            Ok(None)
        }
        Err(e) => Err(ScanError::Join(e)),
    }
}

/// Reads every `*.pdf` directly under `directory`, in file-name order.
///
/// PDFs whose text cannot be extracted are logged and skipped; I/O failures
/// on the directory or on a file abort the scan.
pub async fn scan_pdfs<P: AsRef<Path>>(directory: P) -> Result<Vec<RawDocument>, ScanError> {
    let directory = directory.as_ref();
    let dir_error = |source| ScanError::Directory {
        path: directory.display().to_string(),
        source,
    };

    let mut entries = fs::read_dir(directory).await.map_err(dir_error)?;
    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(dir_error)? {
        let path = entry.path();
        if path.is_file() && is_pdf(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let display = path.display().to_string();
        let bytes = fs::read(&path).await.map_err(|source| ScanError::File {
            path: display.clone(),
            source,
        })?;
        let size = bytes.len() as u64;

        let extracted = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;
        let text = match skip_unextractable(&display, extracted)? {
            Some(text) => normalize_whitespace(&text),
            None => continue,
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| display.clone());

        log::info!("Scanned {} ({} bytes, {} chars)", name, size, text.chars().count());
        documents.push(RawDocument {
            id: display.clone(),
            name,
            path: display,
            size,
            text,
        });
    }

    Ok(documents)
}
