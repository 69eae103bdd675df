use docqa_core::{BlockType, Chunk};
use docqa_text::SparseIndex;
use tempfile::TempDir;

fn chunk(doc_id: &str, idx: usize, text: &str) -> Chunk {
    Chunk {
        text: text.into(),
        doc_id: doc_id.into(),
        chunk_index: idx,
        page_number: idx as u32 + 1,
        section_title: format!("Section {idx}"),
        parent_section: "Manual".into(),
        chunk_type: BlockType::Paragraph,
        token_count: text.split_whitespace().count(),
    }
}

fn corpus() -> Vec<Chunk> {
    vec![
        chunk("manual", 0, "Bleed the hydraulic pump before first use."),
        chunk("manual", 1, "Inspect the pressure valve monthly."),
        chunk("manual", 2, "Replace the gasket when the pump leaks."),
        chunk("faq", 0, "Warranty covers electrical faults only."),
        chunk("faq", 1, "Contact support for shipping questions."),
    ]
}

#[test]
fn sparse_full_flow() {
    let mut index = SparseIndex::new();
    index.add_documents(&corpus());

    let hits = index.search("pump", 10, None);
    assert_eq!(hits.len(), 2);
    assert!(hits[0].bm25_score >= hits[1].bm25_score);
    assert_eq!(hits.iter().map(|h| h.bm25_rank).collect::<Vec<_>>(), vec![1, 2]);
    assert!(hits.iter().all(|h| h.chunk.doc_id == "manual"));

    assert!(index.search("zeppelin", 10, None).is_empty(), "no matching terms yields empty");
    assert!(index.search("a an of", 10, None).is_empty(), "short tokens are dropped from queries");
}

#[test]
fn ties_keep_insertion_order() {
    let mut index = SparseIndex::new();
    index.add_documents(&[
        chunk("x", 0, "filter cartridge"),
        chunk("y", 0, "filter cartridge"),
        chunk("z", 0, "spare bolts"),
        chunk("w", 0, "oil level"),
        chunk("v", 0, "belt tension"),
    ]);
    let hits = index.search("filter", 5, None);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].bm25_score, hits[1].bm25_score);
    assert_eq!(hits[0].chunk.doc_id, "x");
    assert_eq!(hits[1].chunk.doc_id, "y");
}

#[test]
fn add_documents_rebuilds_over_whole_corpus() {
    let mut index = SparseIndex::new();
    index.add_documents(&corpus()[..3]);
    index.add_documents(&corpus()[3..]);
    assert_eq!(index.len(), 5);
    assert_eq!(index.search("warranty", 5, None).len(), 1);
    assert_eq!(index.search("pump", 5, None).len(), 2);
}

#[test]
fn save_and_load_preserve_rankings() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested/bm25_index.json");

    let mut index = SparseIndex::new();
    index.add_documents(&corpus());
    index.save(&path).expect("save");

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["documents"].as_array().unwrap().len(), 5);
    assert_eq!(raw["tokenized"][0][0], "bleed");

    let loaded = SparseIndex::load(&path).expect("load");
    assert_eq!(loaded.search("valve pressure", 3, None), index.search("valve pressure", 3, None));
}

#[test]
fn missing_file_loads_empty() {
    let tmp = TempDir::new().unwrap();
    let index = SparseIndex::load(&tmp.path().join("absent.json")).expect("load");
    assert!(index.is_empty());
    assert!(index.search("pump", 5, None).is_empty());
}
