use docqa_core::{BlockType, Chunk};
use docqa_embed::FakeEmbedder;
use docqa_vector::{DenseIndex, InMemoryDenseIndex, PayloadFilter};
use tempfile::TempDir;

fn chunk(doc_id: &str, idx: usize, section: &str, kind: BlockType, text: &str) -> Chunk {
    Chunk {
        text: text.into(),
        doc_id: doc_id.into(),
        chunk_index: idx,
        page_number: idx as u32 + 1,
        section_title: section.into(),
        parent_section: String::new(),
        chunk_type: kind,
        token_count: text.split_whitespace().count(),
    }
}

fn corpus() -> Vec<Chunk> {
    vec![
        chunk("manual", 0, "Pumps", BlockType::Paragraph, "prime the pump before starting the engine"),
        chunk("manual", 1, "Valves", BlockType::ListItem, "open the relief valve slowly"),
        chunk("manual", 2, "Specs", BlockType::Table, "pressure\t4 bar\nflow\t30 lpm"),
        chunk("faq", 0, "Warranty", BlockType::Paragraph, "warranty claims need a receipt"),
    ]
}

fn index() -> InMemoryDenseIndex<FakeEmbedder> {
    let mut idx = InMemoryDenseIndex::new(FakeEmbedder::new(256));
    assert_eq!(idx.add_chunks(&corpus()).unwrap(), 4);
    idx
}

#[test]
fn exact_text_ranks_first() {
    let idx = index();
    let hits = idx.search("open the relief valve slowly", 3, None).unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].text, "open the relief valve slowly");
    assert!((hits[0].score - 1.0).abs() < 1e-4);
    assert_eq!(hits[0].section_title, "Valves");
    assert_eq!(hits[0].page_number, 2);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn filters_match_one_payload_field() {
    let idx = index();
    let by_doc = idx.search("receipt", 10, Some(&PayloadFilter::DocId("faq".into()))).unwrap();
    assert_eq!(by_doc.len(), 1);
    assert_eq!(by_doc[0].doc_id, "faq");

    let by_section = idx.search("pump", 10, Some(&PayloadFilter::SectionTitle("Pumps".into()))).unwrap();
    assert_eq!(by_section.len(), 1);

    let tables = idx.search("pressure", 10, Some(&PayloadFilter::ChunkType(BlockType::Table))).unwrap();
    assert_eq!(tables.len(), 1);
    assert!(tables[0].text.starts_with("pressure"));
}

#[test]
fn reingest_upserts_and_delete_removes() {
    let mut idx = index();
    idx.add_chunks(&corpus()[..2]).unwrap();
    assert_eq!(idx.len(), 4, "same doc_id and chunk_index replace existing points");

    assert_eq!(idx.delete("manual").unwrap(), 3);
    assert_eq!(idx.len(), 1);
    assert_eq!(idx.delete("manual").unwrap(), 0);
    let hits = idx.search("pump", 10, None).unwrap();
    assert!(hits.iter().all(|h| h.doc_id == "faq"));
}

#[test]
fn save_and_load() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("dense/index.json");
    let idx = index();
    idx.save(&path).unwrap();

    let loaded = InMemoryDenseIndex::load(&path, FakeEmbedder::new(256)).unwrap();
    assert_eq!(loaded.len(), 4);
    let q = "warranty claims need a receipt";
    assert_eq!(loaded.search(q, 2, None).unwrap(), idx.search(q, 2, None).unwrap());

    assert!(InMemoryDenseIndex::load(&path, FakeEmbedder::new(8)).is_err(), "dimension must match");
    assert!(InMemoryDenseIndex::load(&tmp.path().join("missing.json"), FakeEmbedder::new(8)).unwrap().is_empty());
}
