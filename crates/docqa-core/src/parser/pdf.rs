//! PDF parser on top of `pdf-extract`.
//!
//! `pdf-extract` yields the whole document as one string with pages separated
//! by form feeds. Font information is not available, so headings are only
//! recognised as short single-line blocks written in capitals. Title and
//! author come from the trailer's Info dictionary. Tables are not detected:
//! the extracted text carries no cell geometry, so table content arrives as
//! ordinary paragraphs.

use std::path::Path;

use pdf_extract::{decode_text_string, Document};

use super::{looks_like_list_item, parse_error, DocumentParser, SectionTracker};
use crate::error::Result;
use crate::preprocess::clean_text;
use crate::types::{BlockType, ParsedDocument};

const MAX_HEADING_WORDS: usize = 12;

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn parse(&self, path: &Path, doc_id: &str) -> Result<ParsedDocument> {
        let bytes = std::fs::read(path)?;
        let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| parse_error(path, e))?;
        let mut doc = parse_pages(&text, doc_id, &path.display().to_string());
        match Document::load_mem(&bytes) {
            Ok(pdf) => (doc.title, doc.author) = info_metadata(&pdf),
            Err(e) => tracing::debug!(doc_id, error = %e, "pdf metadata unavailable"),
        }
        tracing::info!(doc_id, blocks = doc.blocks.len(), pages = doc.total_pages, "parsed pdf");
        Ok(doc)
    }
}

pub(crate) fn parse_pages(text: &str, doc_id: &str, filename: &str) -> ParsedDocument {
    let mut doc = ParsedDocument::new(doc_id, filename);
    let mut tracker = SectionTracker::default();

    let pages: Vec<&str> = text.trim_end_matches('\x0C').split('\x0C').collect();
    doc.total_pages = pages.len() as u32;

    for (idx, page) in pages.iter().enumerate() {
        let page_number = idx as u32 + 1;
        let cleaned = clean_text(page);
        for raw in cleaned.split("\n\n") {
            let lines: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
            if lines.is_empty() {
                continue;
            }
            let content = lines.join(" ");
            let kind = classify(&lines);
            if kind == BlockType::Heading {
                tracker.enter_heading(&content, 1);
            }
            doc.blocks.push(tracker.block(content, kind, page_number));
        }
    }
    doc
}

/// `(Title, Author)` from the Info dictionary; missing or undecodable entries
/// are empty.
pub(crate) fn info_metadata(pdf: &Document) -> (String, String) {
    let info = pdf
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| pdf.dereference(obj).ok())
        .and_then(|(_, obj)| obj.as_dict().ok());
    let field = |key: &[u8]| {
        info.and_then(|d| d.get(key).ok())
            .and_then(|obj| pdf.dereference(obj).ok())
            .and_then(|(_, obj)| decode_text_string(obj).ok())
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    (field(b"Title"), field(b"Author"))
}

fn classify(lines: &[&str]) -> BlockType {
    let first = lines[0];
    if looks_like_list_item(first) {
        return BlockType::ListItem;
    }
    if lines.len() == 1 && looks_like_heading(first) {
        return BlockType::Heading;
    }
    BlockType::Paragraph
}

fn looks_like_heading(line: &str) -> bool {
    let words = line.split_whitespace().count();
    let has_letters = line.chars().any(char::is_alphabetic);
    let ends_like_sentence = line.ends_with(['.', ',', ';', ':', '?', '!']);
    words <= MAX_HEADING_WORDS
        && has_letters
        && !ends_like_sentence
        && line.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase)
}
