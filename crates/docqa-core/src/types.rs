//! Domain types shared by the chunker and the sparse/dense indexes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type Meta = HashMap<String, String>;

/// Structural kind of a parsed block. Chunks inherit the kind of their source
/// block(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Heading,
    Paragraph,
    Table,
    ListItem,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Heading => "heading",
            BlockType::Paragraph => "paragraph",
            BlockType::Table => "table",
            BlockType::ListItem => "list_item",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heading" => Ok(BlockType::Heading),
            "paragraph" => Ok(BlockType::Paragraph),
            "table" => Ok(BlockType::Table),
            "list_item" => Ok(BlockType::ListItem),
            other => Err(Error::InvalidConfig(format!("unknown block type '{other}'"))),
        }
    }
}

/// One structurally meaningful unit of a source document, in reading order.
///
/// - `page_number`: 1-based, or 0 when the format has no pages
/// - `section_title`: nearest enclosing heading text (may be empty)
/// - `parent_section`: nearest enclosing top-level heading (may be empty)
///
/// Section lineage is assigned by the parser and never recomputed downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentBlock {
    pub content: String,
    pub block_type: BlockType,
    pub page_number: u32,
    #[serde(default)]
    pub section_title: String,
    #[serde(default)]
    pub parent_section: String,
    #[serde(default)]
    pub metadata: Meta,
}

impl DocumentBlock {
    pub fn new(content: impl Into<String>, block_type: BlockType, page_number: u32) -> Self {
        Self {
            content: content.into(),
            block_type,
            page_number,
            section_title: String::new(),
            parent_section: String::new(),
            metadata: Meta::new(),
        }
    }

    pub fn with_section(mut self, section_title: impl Into<String>, parent_section: impl Into<String>) -> Self {
        self.section_title = section_title.into();
        self.parent_section = parent_section.into();
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Output of a document parser: the flat block stream plus file-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub doc_id: String,
    pub filename: String,
    pub blocks: Vec<DocumentBlock>,
    pub total_pages: u32,
    pub title: String,
    pub author: String,
}

impl ParsedDocument {
    pub fn new(doc_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self { doc_id: doc_id.into(), filename: filename.into(), ..Self::default() }
    }

    pub fn with_blocks(mut self, blocks: Vec<DocumentBlock>) -> Self {
        self.blocks = blocks;
        self
    }
}

/// The retrievable unit stored in both indexes.
///
/// `chunk_index` is dense (0..N-1) per document and only assigned after all
/// splitting and merging is final. `token_count` always reflects the final
/// `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub doc_id: String,
    pub chunk_index: usize,
    pub page_number: u32,
    pub section_title: String,
    pub parent_section: String,
    pub chunk_type: BlockType,
    pub token_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_type_serializes_snake_case() {
        let json = serde_json::to_string(&BlockType::ListItem).unwrap();
        assert_eq!(json, "\"list_item\"");
        let back: BlockType = serde_json::from_str("\"table\"").unwrap();
        assert_eq!(back, BlockType::Table);
    }

    #[test]
    fn block_type_parses_from_str() {
        assert_eq!("Heading".parse::<BlockType>().unwrap(), BlockType::Heading);
        assert!("figure".parse::<BlockType>().is_err());
    }

    #[test]
    fn blank_block_detection() {
        assert!(DocumentBlock::new("  \n\t", BlockType::Paragraph, 1).is_blank());
        assert!(!DocumentBlock::new("x", BlockType::Paragraph, 1).is_blank());
    }
}
