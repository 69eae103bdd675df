//! Document parsers and extension dispatch.
//!
//! Each format implements [`DocumentParser`]; [`ParserRegistry`] picks one by
//! lowercase file extension. Parsers attach section lineage to every block, so
//! nothing downstream ever recomputes it.

mod docx;
mod pdf;
mod text;

pub use docx::DocxParser;
pub use pdf::PdfParser;
pub use text::TextParser;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{BlockType, DocumentBlock, ParsedDocument};

pub trait DocumentParser: Send + Sync {
    fn parse(&self, path: &Path, doc_id: &str) -> Result<ParsedDocument>;
}

pub struct ParserRegistry {
    parsers: BTreeMap<String, Arc<dyn DocumentParser>>,
}

impl ParserRegistry {
    pub fn empty() -> Self {
        Self { parsers: BTreeMap::new() }
    }

    /// `.txt`/`.md`, `.docx` and `.pdf`. Legacy binary `.doc` is left unmapped.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        let text: Arc<dyn DocumentParser> = Arc::new(TextParser);
        registry.register("txt", text.clone());
        registry.register("md", text);
        registry.register("docx", Arc::new(DocxParser));
        registry.register("pdf", Arc::new(PdfParser));
        registry
    }

    pub fn register(&mut self, extension: &str, parser: Arc<dyn DocumentParser>) {
        self.parsers.insert(extension.trim_start_matches('.').to_ascii_lowercase(), parser);
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.parsers.contains_key(&extension_of(path))
    }

    /// Parse `path`; `doc_id` defaults to the file stem.
    pub fn parse(&self, path: &Path, doc_id: Option<&str>) -> Result<ParsedDocument> {
        let ext = extension_of(path);
        let parser = self.parsers.get(&ext).ok_or_else(|| Error::UnsupportedFormat(format!(".{ext}")))?;
        let doc_id = match doc_id {
            Some(id) => id.to_string(),
            None => default_doc_id(path),
        };
        tracing::info!(path = %path.display(), doc_id = %doc_id, "parsing document");
        let doc = parser.parse(path, &doc_id)?;
        tracing::debug!(doc_id = %doc.doc_id, blocks = doc.blocks.len(), pages = doc.total_pages, "parsed");
        Ok(doc)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn extension_of(path: &Path) -> String {
    path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase()
}

pub fn default_doc_id(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Bullet or `N.` numbered line.
pub(crate) fn looks_like_list_item(text: &str) -> bool {
    let t = text.trim_start();
    let mut chars = t.chars();
    match chars.next() {
        Some('•') | Some('–') => true,
        Some('-') | Some('*') => matches!(chars.next(), Some(c) if c.is_whitespace()),
        Some('1'..='9') => chars.next() == Some('.'),
        _ => false,
    }
}

/// Running section lineage while walking a block stream in reading order.
#[derive(Debug, Default)]
pub(crate) struct SectionTracker {
    current: String,
    parent: String,
}

impl SectionTracker {
    /// Levels 1 and 2 are top-level and also reset the parent section.
    pub(crate) fn enter_heading(&mut self, title: &str, level: u32) {
        self.current = title.to_string();
        if level <= 2 {
            self.parent = title.to_string();
        }
    }

    pub(crate) fn block(&self, content: impl Into<String>, block_type: BlockType, page: u32) -> DocumentBlock {
        DocumentBlock::new(content, block_type, page).with_section(self.current.clone(), self.parent.clone())
    }
}

pub(crate) fn parse_error(path: &Path, message: impl ToString) -> Error {
    Error::Parse { path: path.display().to_string(), message: message.to_string() }
}
