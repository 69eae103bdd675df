//! Structure-aware chunking.
//!
//! Blocks are grouped by section, oversized non-table blocks are split at
//! sentence boundaries with token-bounded backward overlap, undersized
//! neighbours are coalesced, and finally chunk indices are assigned 0..N-1.

use std::sync::Arc;
use tracing::debug;

use crate::config::ChunkingConfig;
use crate::sentence::split_sentences;
use crate::traits::LengthMetric;
use crate::types::{BlockType, Chunk, DocumentBlock, ParsedDocument};

/// A contiguous run of blocks opened by a heading (or by the start of the
/// document, with an empty title).
#[derive(Debug, Clone)]
pub struct SectionGroup<'a> {
    pub title: String,
    pub blocks: Vec<&'a DocumentBlock>,
}

pub struct StructureAwareChunker {
    metric: Arc<dyn LengthMetric>,
    config: ChunkingConfig,
}

impl StructureAwareChunker {
    pub fn new(metric: Arc<dyn LengthMetric>, config: ChunkingConfig) -> Self {
        Self { metric, config }
    }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    pub fn metric(&self) -> &Arc<dyn LengthMetric> { &self.metric }

    /// Chunk one parsed document. Deterministic for a given block stream,
    /// metric and configuration.
    pub fn chunk_document(&self, doc: &ParsedDocument) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for group in group_by_section(&doc.blocks) {
            for block in group.blocks {
                self.emit_block(block, &doc.doc_id, &mut chunks);
            }
        }
        let emitted = chunks.len();
        let chunks = self.merge_small_chunks(chunks);
        debug!(doc_id = %doc.doc_id, blocks = doc.blocks.len(), emitted, chunks = chunks.len(), "chunked document");
        chunks
    }

    fn emit_block(&self, block: &DocumentBlock, doc_id: &str, out: &mut Vec<Chunk>) {
        let tokens = self.metric.count(&block.content);
        match block.block_type {
            // Tables lose their structure under token-level splitting.
            BlockType::Table => out.push(self.block_chunk(block, doc_id, tokens)),
            BlockType::Heading | BlockType::Paragraph | BlockType::ListItem => {
                if tokens <= self.config.max_tokens {
                    out.push(self.block_chunk(block, doc_id, tokens));
                } else {
                    out.extend(self.split_with_overlap(block, doc_id));
                }
            }
        }
    }

    fn block_chunk(&self, block: &DocumentBlock, doc_id: &str, token_count: usize) -> Chunk {
        Chunk {
            text: block.content.clone(),
            doc_id: doc_id.to_string(),
            chunk_index: 0,
            page_number: block.page_number,
            section_title: block.section_title.clone(),
            parent_section: block.parent_section.clone(),
            chunk_type: block.block_type,
            token_count,
        }
    }

    /// Split one block into sentence-aligned chunks of at most `max_tokens`
    /// (a single sentence above the limit is emitted whole). Each new buffer
    /// is seeded with the longest run of trailing sentences from the previous
    /// one whose total stays within `overlap_tokens`.
    pub fn split_with_overlap(&self, block: &DocumentBlock, doc_id: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut buffer: Vec<(&str, usize)> = Vec::new();
        let mut buffer_tokens = 0usize;

        for sentence in split_sentences(&block.content) {
            let sentence_tokens = self.metric.count(sentence);
            if buffer_tokens + sentence_tokens > self.config.max_tokens && !buffer.is_empty() {
                chunks.push(self.sentence_chunk(block, doc_id, &buffer));
                let carried = self.overlap_tail(&buffer);
                buffer_tokens = carried.iter().map(|(_, t)| t).sum();
                buffer = carried;
            }
            buffer.push((sentence, sentence_tokens));
            buffer_tokens += sentence_tokens;
        }
        if !buffer.is_empty() {
            chunks.push(self.sentence_chunk(block, doc_id, &buffer));
        }
        chunks
    }

    fn overlap_tail<'a>(&self, buffer: &[(&'a str, usize)]) -> Vec<(&'a str, usize)> {
        let mut tail = Vec::new();
        let mut tail_tokens = 0usize;
        for &(sentence, tokens) in buffer.iter().rev() {
            if tail_tokens + tokens > self.config.overlap_tokens { break; }
            tail.push((sentence, tokens));
            tail_tokens += tokens;
        }
        tail.reverse();
        tail
    }

    fn sentence_chunk(&self, block: &DocumentBlock, doc_id: &str, sentences: &[(&str, usize)]) -> Chunk {
        let text = sentences.iter().map(|(s, _)| *s).collect::<Vec<_>>().join(" ").trim().to_string();
        let token_count = self.metric.count(&text);
        Chunk { text, ..self.block_chunk(block, doc_id, token_count) }
    }

    /// Coalesce undersized neighbours of the same type and section, then
    /// reindex. A run is closed when the type or section changes, when the
    /// combined size would pass `max_tokens`, or when both the run and the
    /// incoming chunk already reach `min_chunk_tokens`.
    pub fn merge_small_chunks(&self, chunks: Vec<Chunk>) -> Vec<Chunk> {
        let mut merged = Vec::with_capacity(chunks.len());
        let mut run: Vec<Chunk> = Vec::new();
        let mut run_tokens = 0usize;

        for chunk in chunks {
            if let Some(head) = run.first() {
                let closes = chunk.chunk_type != head.chunk_type
                    || chunk.section_title != head.section_title
                    || run_tokens + chunk.token_count > self.config.max_tokens
                    || (run_tokens >= self.config.min_chunk_tokens && chunk.token_count >= self.config.min_chunk_tokens);
                if closes {
                    merged.extend(coalesce(std::mem::take(&mut run), run_tokens));
                    run_tokens = 0;
                }
            }
            run_tokens += chunk.token_count;
            run.push(chunk);
        }
        merged.extend(coalesce(run, run_tokens));
        reindex(&mut merged);
        merged
    }
}

/// Group blocks by heading. Blank blocks are skipped.
pub fn group_by_section(blocks: &[DocumentBlock]) -> Vec<SectionGroup<'_>> {
    let mut groups = Vec::new();
    let mut current = SectionGroup { title: String::new(), blocks: Vec::new() };

    for block in blocks.iter().filter(|b| !b.is_blank()) {
        if block.block_type == BlockType::Heading {
            let title = block.content.trim().to_string();
            let finished = std::mem::replace(&mut current, SectionGroup { title, blocks: Vec::new() });
            if !finished.blocks.is_empty() { groups.push(finished); }
        }
        current.blocks.push(block);
    }
    if !current.blocks.is_empty() { groups.push(current); }
    groups
}

/// Build a fresh chunk from a run; inputs are consumed, never aliased.
fn coalesce(run: Vec<Chunk>, token_count: usize) -> Option<Chunk> {
    let head = run.first()?;
    let text = run.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
    Some(Chunk {
        text,
        doc_id: head.doc_id.clone(),
        chunk_index: head.chunk_index,
        page_number: head.page_number,
        section_title: head.section_title.clone(),
        parent_section: head.parent_section.clone(),
        chunk_type: head.chunk_type,
        token_count,
    })
}

fn reindex(chunks: &mut [Chunk]) {
    for (idx, chunk) in chunks.iter_mut().enumerate() {
        chunk.chunk_index = idx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::WhitespaceMetric;

    fn chunker(max_tokens: usize, overlap_tokens: usize, min_chunk_tokens: usize) -> StructureAwareChunker {
        StructureAwareChunker::new(
            Arc::new(WhitespaceMetric),
            ChunkingConfig { max_tokens, overlap_tokens, min_chunk_tokens },
        )
    }

    fn words(n: usize, tag: &str) -> String {
        (0..n).map(|i| format!("{tag}{i}")).collect::<Vec<_>>().join(" ")
    }

    fn para(text: impl Into<String>, section: &str) -> DocumentBlock {
        DocumentBlock::new(text, BlockType::Paragraph, 1).with_section(section, section)
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let doc = ParsedDocument::new("d", "d.txt");
        assert!(chunker(512, 50, 50).chunk_document(&doc).is_empty());
    }

    #[test]
    fn single_block_is_one_chunk_at_index_zero() {
        let doc = ParsedDocument::new("d", "d.txt").with_blocks(vec![para("hello there world", "")]);
        let chunks = chunker(512, 50, 50).chunk_document(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].token_count, 3);
        assert_eq!(chunks[0].doc_id, "d");
    }

    #[test]
    fn grouping_opens_groups_at_headings() {
        let blocks = vec![
            para("preamble", ""),
            DocumentBlock::new("  Intro ", BlockType::Heading, 1),
            para("body", "Intro"),
            DocumentBlock::new("Usage", BlockType::Heading, 2),
        ];
        let groups = group_by_section(&blocks);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].title, "");
        assert_eq!(groups[1].title, "Intro");
        assert_eq!(groups[1].blocks.len(), 2);
        assert_eq!(groups[2].title, "Usage");
    }

    #[test]
    fn blank_blocks_are_skipped() {
        let doc = ParsedDocument::new("d", "d.txt").with_blocks(vec![para("   ", ""), para("kept", "")]);
        let chunks = chunker(512, 50, 50).chunk_document(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "kept");
    }

    #[test]
    fn tables_are_never_split() {
        let table = format!("{}\n{}", words(30, "a"), words(30, "b"));
        let doc = ParsedDocument::new("d", "d.docx").with_blocks(vec![
            DocumentBlock::new(table.clone(), BlockType::Table, 3),
        ]);
        let chunks = chunker(10, 2, 1).chunk_document(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, BlockType::Table);
        assert_eq!(chunks[0].text, table);
        assert_eq!(chunks[0].token_count, 60);
    }

    #[test]
    fn oversized_block_splits_with_backward_overlap() {
        // five sentences of 4 words each
        let text = (0..5).map(|i| format!("s{i} w w end.")).collect::<Vec<_>>().join(" ");
        let block = para(text, "S");
        let chunks = chunker(10, 4, 0).split_with_overlap(&block, "d");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "s0 w w end. s1 w w end.",
                "s1 w w end. s2 w w end.",
                "s2 w w end. s3 w w end.",
                "s3 w w end. s4 w w end.",
            ]
        );
        for c in &chunks {
            assert_eq!(c.token_count, 8);
            assert_eq!(c.section_title, "S");
        }
    }

    #[test]
    fn overlap_is_token_bounded_not_sentence_counted() {
        // sentences of 3, 3, 6 words; overlap budget 5 only carries one 3-word sentence
        let block = para("a b c. d e f. g h i j k l.", "");
        let chunks = chunker(8, 5, 0).split_with_overlap(&block, "d");
        assert_eq!(chunks[0].text, "a b c. d e f.");
        assert_eq!(chunks[1].text, "d e f. g h i j k l.");
    }

    #[test]
    fn oversized_single_sentence_is_emitted_whole() {
        let long = format!("{}.", words(20, "x"));
        let block = para(format!("short one. {long} tail end."), "");
        let chunks = chunker(10, 0, 0).split_with_overlap(&block, "d");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].text, long);
        assert_eq!(chunks[1].token_count, 20);
    }

    #[test]
    fn undersized_neighbours_coalesce() {
        let doc = ParsedDocument::new("d", "d.txt").with_blocks(vec![
            para(words(40, "a"), "S"),
            para(words(30, "b"), "S"),
        ]);
        let chunks = chunker(512, 50, 50).chunk_document(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].token_count, 70);
        assert_eq!(chunks[0].text, format!("{} {}", words(40, "a"), words(30, "b")));
    }

    #[test]
    fn adequate_neighbours_do_not_merge() {
        let doc = ParsedDocument::new("d", "d.txt").with_blocks(vec![
            para(words(60, "a"), "S"),
            para(words(55, "b"), "S"),
        ]);
        let chunks = chunker(512, 50, 50).chunk_document(&doc);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn merge_respects_section_type_and_size() {
        let doc = ParsedDocument::new("d", "d.txt").with_blocks(vec![
            para(words(5, "a"), "S1"),
            para(words(5, "b"), "S2"),
            DocumentBlock::new(words(5, "c"), BlockType::ListItem, 1).with_section("S2", "S2"),
            DocumentBlock::new(words(5, "d"), BlockType::ListItem, 1).with_section("S2", "S2"),
            DocumentBlock::new(words(8, "e"), BlockType::ListItem, 1).with_section("S2", "S2"),
        ]);
        let chunks = chunker(12, 2, 50).chunk_document(&doc);
        let shape: Vec<(BlockType, usize)> = chunks.iter().map(|c| (c.chunk_type, c.token_count)).collect();
        assert_eq!(
            shape,
            vec![
                (BlockType::Paragraph, 5),
                (BlockType::Paragraph, 5),
                (BlockType::ListItem, 10),
                (BlockType::ListItem, 8),
            ]
        );
        let indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn merged_chunk_is_a_new_value() {
        let first = Chunk {
            text: "a".into(),
            doc_id: "d".into(),
            chunk_index: 7,
            page_number: 2,
            section_title: "S".into(),
            parent_section: "P".into(),
            chunk_type: BlockType::Paragraph,
            token_count: 1,
        };
        let second = Chunk { text: "b".into(), page_number: 3, ..first.clone() };
        let original = first.clone();
        let merged = chunker(512, 0, 50).merge_small_chunks(vec![first.clone(), second]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "a b");
        assert_eq!(merged[0].page_number, 2);
        assert_eq!(merged[0].parent_section, "P");
        assert_eq!(first, original);
    }
}
