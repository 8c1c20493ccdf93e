//! PDF directory loader.

use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::IndexError;
use crate::models::{IngestConfig, Metadata, RawDocument};
use crate::utils::{calculate_bytes_checksum, matches_file_pattern};

/// Loads every PDF in a directory as one raw document per page.
#[derive(Debug)]
pub struct PdfLoader {
    /// Directory to scan
    root: PathBuf,

    /// File name glob, `*.pdf` by default
    pattern: glob::Pattern,

    /// Descend into subdirectories
    recursive: bool,
}

/// Result of loading a directory.
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    pub documents: Vec<RawDocument>,
    pub files: Vec<PathBuf>,
    pub pages: usize,
    pub blank_pages: usize,
}

impl PdfLoader {
    pub fn new(root: PathBuf, pattern: &str, recursive: bool) -> Result<Self, IndexError> {
        let pattern =
            glob::Pattern::new(pattern).map_err(|e| IndexError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            root,
            pattern,
            recursive,
        })
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self, IndexError> {
        Self::new(config.data_dir.clone(), &config.pattern, config.recursive)
    }

    /// Collect matching files, sorted by path.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>, IndexError> {
        if !self.root.is_dir() {
            return Err(IndexError::DirectoryNotFound(self.root.clone()));
        }

        let mut walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name();
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| IndexError::WalkError(e.to_string()))?;
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }

            if matches_file_pattern(path, &self.pattern) {
                files.push(path.to_path_buf());
            }
        }

        if files.is_empty() {
            return Err(IndexError::NoFilesFound {
                dir: self.root.clone(),
                pattern: self.pattern.as_str().to_string(),
            });
        }

        Ok(files)
    }

    /// Load every matching file. Any unreadable or unparsable file aborts the
    /// load, as does a directory whose pages are all blank.
    pub fn load(&self) -> Result<LoadedDocuments, IndexError> {
        let mut loaded = LoadedDocuments {
            files: self.collect_files()?,
            ..Default::default()
        };

        for path in &loaded.files {
            let pages = self.read_pages(path)?;
            loaded.pages += pages.len();
            for doc in pages {
                if doc.content.trim().is_empty() {
                    debug!(
                        source = doc.source().unwrap_or_default(),
                        page = doc.metadata.get("page").and_then(|v| v.as_u64()),
                        "skipping page without extractable text"
                    );
                    loaded.blank_pages += 1;
                    continue;
                }
                loaded.documents.push(doc);
            }
        }

        if loaded.documents.is_empty() {
            return Err(IndexError::NoTextExtracted {
                dir: self.root.clone(),
                pages: loaded.pages,
            });
        }

        info!(
            files = loaded.files.len(),
            pages = loaded.pages,
            documents = loaded.documents.len(),
            "loaded PDF documents"
        );
        Ok(loaded)
    }

    /// Extract the text of each page of one PDF.
    pub fn read_pages(&self, path: &Path) -> Result<Vec<RawDocument>, IndexError> {
        let bytes = std::fs::read(path).map_err(|e| IndexError::FileReadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let pages = extract_pages(&bytes).map_err(|message| IndexError::PdfParse {
            path: path.to_path_buf(),
            message,
        })?;

        let source = path.to_string_lossy().to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let checksum = calculate_bytes_checksum(&bytes);
        let total_pages = pages.len();

        debug!(source = %source, pages = total_pages, "extracted PDF text");

        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(page, content)| {
                let mut metadata = Metadata::new();
                metadata.insert("source".to_string(), json!(source));
                metadata.insert("page".to_string(), json!(page));
                metadata.insert("total_pages".to_string(), json!(total_pages));
                metadata.insert("file_name".to_string(), json!(file_name));
                metadata.insert("size_bytes".to_string(), json!(bytes.len()));
                metadata.insert("checksum".to_string(), json!(checksum));
                RawDocument::new(content, metadata)
            })
            .collect())
    }
}

/// Run the PDF text extractor, turning both errors and panics inside the
/// parser into an error message.
fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, String> {
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("PDF parser panicked".to_string()),
    }
}
