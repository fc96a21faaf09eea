//! Loader selection by file extension and the three supported loaders.
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

/// Text extracted from a file. PDFs produce one document per page.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub content: String,
    /// Zero-based page number, for paged formats.
    pub page: Option<u32>,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("failed to parse DOCX: {0}")]
    Docx(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderKind {
    Pdf,
    Docx,
    Text,
}

impl LoaderKind {
    /// Extensions the synchronizer picks up, lowercase and without the dot.
    pub const SUPPORTED_EXTENSIONS: [&'static str; 3] = ["pdf", "docx", "txt"];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

/// A loader bound to one file.
#[derive(Debug, Clone)]
pub struct Loader {
    kind: LoaderKind,
    path: PathBuf,
}

/// Pick a loader for `path` by extension. Unsupported files are warned about
/// and yield `None`.
pub fn select_loader(path: &Path) -> Option<Loader> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    match LoaderKind::from_extension(ext) {
        Some(kind) => Some(Loader {
            kind,
            path: path.to_path_buf(),
        }),
        None => {
            warn!(
                "No loader for file type '.{}', skipping {}",
                ext.to_ascii_lowercase(),
                path.display()
            );
            None
        }
    }
}

impl Loader {
    pub fn kind(&self) -> LoaderKind {
        self.kind
    }

    pub fn load(&self) -> Result<Vec<Document>, LoadError> {
        match self.kind {
            LoaderKind::Pdf => load_pdf(&self.path),
            LoaderKind::Docx => load_docx(&self.path),
            LoaderKind::Text => load_text(&self.path),
        }
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_text(path: &Path) -> Result<Vec<Document>, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(vec![Document {
        content,
        page: None,
    }])
}

fn load_pdf(path: &Path) -> Result<Vec<Document>, LoadError> {
    let bytes = read_bytes(path)?;
    let pdf = lopdf::Document::load_mem(&bytes)?;

    let mut documents = Vec::new();
    // get_pages is keyed by 1-based page number
    for page_number in pdf.get_pages().into_keys() {
        match pdf.extract_text(&[page_number]) {
            Ok(content) => documents.push(Document {
                content,
                page: Some(page_number - 1),
            }),
            Err(e) => warn!(
                "Could not extract text from page {page_number} of {}: {e}",
                path.display()
            ),
        }
    }

    debug!("Loaded {} pages from {}", documents.len(), path.display());
    Ok(documents)
}

fn load_docx(path: &Path) -> Result<Vec<Document>, LoadError> {
    let bytes = read_bytes(path)?;
    let docx = docx_rs::read_docx(&bytes).map_err(|e| LoadError::Docx(e.to_string()))?;

    let mut lines = Vec::new();
    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(paragraph) => lines.push(paragraph_text(paragraph)),
            docx_rs::DocumentChild::Table(table) => table_lines(table, &mut lines),
            _ => {}
        }
    }

    Ok(vec![Document {
        content: lines.join("\n"),
        page: None,
    }])
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                    docx_rs::RunChild::Tab(_) => text.push('\t'),
                    docx_rs::RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}

#[allow(irrefutable_let_patterns)]
fn table_lines(table: &docx_rs::Table, lines: &mut Vec<String>) {
    for row in &table.rows {
        let docx_rs::TableChild::TableRow(row) = row else {
            continue;
        };
        for cell in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = cell else {
                continue;
            };
            for content in &cell.children {
                if let docx_rs::TableCellContent::Paragraph(paragraph) = content {
                    lines.push(paragraph_text(paragraph));
                }
            }
        }
    }
}
