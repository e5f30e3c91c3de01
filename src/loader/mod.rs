//! Course material loading: PDF, PPTX, DOCX and TXT files into [`Document`]s.

mod office;
mod pdf;

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use walkdir::WalkDir;

use crate::rag::{Document, FileType};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file type: {0}")]
    Unsupported(PathBuf),

    #[error("Data directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("Invalid Office archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("File is not valid UTF-8: {0}")]
    Encoding(PathBuf),
}

pub type Result<T> = std::result::Result<T, LoadError>;

/// Result of loading one file during a directory scan.
#[derive(Debug)]
pub struct LoadOutcome {
    pub path: PathBuf,
    pub result: Result<Vec<Document>>,
}

#[derive(Debug, Clone)]
pub struct DocumentLoader {
    data_dir: PathBuf,
}

impl DocumentLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Supported files under the data directory, sorted by path.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        if !self.data_dir.is_dir() {
            return Err(LoadError::MissingDirectory(self.data_dir.clone()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.data_dir)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry under {}: {}", self.data_dir.display(), e);
                    continue;
                }
            };
            if entry.file_type().is_file() && FileType::from_path(entry.path()).is_some() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Load every supported file, reporting success or failure per file.
    ///
    /// Files are parsed in parallel; outcomes keep discovery order.
    pub fn load_all(&self) -> Result<Vec<LoadOutcome>> {
        let files = self.discover()?;
        log::info!(
            "Found {} supported file(s) in {}",
            files.len(),
            self.data_dir.display()
        );

        let outcomes: Vec<LoadOutcome> = files
            .into_par_iter()
            .map(|path| {
                let result = Self::load_document(&path);
                match &result {
                    Ok(docs) => log::debug!("Loaded {} ({} document(s))", path.display(), docs.len()),
                    Err(e) => log::warn!("Failed to load {}: {}", path.display(), e),
                }
                LoadOutcome { path, result }
            })
            .collect();
        Ok(outcomes)
    }

    /// Load one file into documents: one per page for PDF, one per slide for
    /// PPTX, a single document for DOCX and TXT.
    pub fn load_document(path: &Path) -> Result<Vec<Document>> {
        let filetype =
            FileType::from_path(path).ok_or_else(|| LoadError::Unsupported(path.to_path_buf()))?;
        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let document = |content: String, page_number: u32| Document {
            content,
            filename: file_name(path),
            filepath: path.display().to_string(),
            filetype,
            page_number,
            images: Vec::new(),
        };

        let documents = match filetype {
            FileType::Pdf => pdf::extract_pages(&bytes)?
                .into_iter()
                .zip(1u32..)
                .map(|(text, n)| document(format!("--- 第 {} 页 ---\n{}\n", n, text), n))
                .collect(),
            FileType::Pptx => office::extract_pptx(Cursor::new(bytes))?
                .into_iter()
                .zip(1u32..)
                .map(|(text, n)| {
                    let text = if text.trim().is_empty() {
                        "[无文本内容]".to_string()
                    } else {
                        text
                    };
                    document(format!("--- 幻灯片 {} ---\n{}\n", n, text), n)
                })
                .collect(),
            FileType::Docx => {
                let text = office::extract_docx(Cursor::new(bytes))?.join("\n\n");
                single(text, |text| document(format!("--- DOCX文件 ---\n{}\n", text), 0))
            }
            FileType::Txt => {
                let text =
                    String::from_utf8(bytes).map_err(|_| LoadError::Encoding(path.to_path_buf()))?;
                single(text, |text| document(format!("--- TXT文件 ---\n{}\n", text), 0))
            }
        };
        Ok(documents)
    }
}

/// A whole-file document, or none when the file holds no text.
fn single(text: String, make: impl FnOnce(&str) -> Document) -> Vec<Document> {
    let text = text.trim();
    if text.is_empty() {
        Vec::new()
    } else {
        vec![make(text)]
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
