//! Plain-text and Markdown parser.

use std::path::Path;

use super::{looks_like_list_item, DocumentParser, SectionTracker};
use crate::error::Result;
use crate::preprocess::clean_text;
use crate::types::{BlockType, DocumentBlock, ParsedDocument};

/// Blank lines end paragraphs, `#` lines are headings and bullet or numbered
/// lines are list items. Page number is always 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextParser;

impl TextParser {
    pub fn parse_str(&self, content: &str, doc_id: &str, filename: &str) -> ParsedDocument {
        let cleaned = clean_text(content);
        let mut tracker = SectionTracker::default();
        let mut blocks: Vec<DocumentBlock> = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        let mut title = String::new();

        for line in cleaned.lines() {
            let line = line.trim();
            if line.is_empty() {
                flush(&mut paragraph, &tracker, &mut blocks);
                continue;
            }
            if let Some((level, heading)) = markdown_heading(line) {
                flush(&mut paragraph, &tracker, &mut blocks);
                tracker.enter_heading(heading, level);
                if level == 1 && title.is_empty() {
                    title = heading.to_string();
                }
                blocks.push(tracker.block(heading, BlockType::Heading, 0).with_meta("level", level.to_string()));
            } else if looks_like_list_item(line) {
                flush(&mut paragraph, &tracker, &mut blocks);
                blocks.push(tracker.block(line, BlockType::ListItem, 0));
            } else {
                paragraph.push(line);
            }
        }
        flush(&mut paragraph, &tracker, &mut blocks);

        let mut doc = ParsedDocument::new(doc_id, filename).with_blocks(blocks);
        doc.title = title;
        doc
    }
}

impl DocumentParser for TextParser {
    fn parse(&self, path: &Path, doc_id: &str) -> Result<ParsedDocument> {
        let bytes = std::fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes);
        Ok(self.parse_str(&content, doc_id, &path.display().to_string()))
    }
}

fn flush(paragraph: &mut Vec<&str>, tracker: &SectionTracker, blocks: &mut Vec<DocumentBlock>) {
    if paragraph.is_empty() {
        return;
    }
    blocks.push(tracker.block(paragraph.join(" "), BlockType::Paragraph, 0));
    paragraph.clear();
}

/// `## Title` -> `(2, "Title")`. Up to six `#`, followed by a space.
fn markdown_heading(line: &str) -> Option<(u32, &str)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(' ') {
        return None;
    }
    let title = rest.trim();
    (!title.is_empty()).then_some((hashes as u32, title))
}
