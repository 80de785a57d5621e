use std::sync::Arc;
use std::thread;

use docqa_core::types::{Chunk, MetaValue};
use docqa_core::Error;
use docqa_sparse::{Bm25Params, SparseIndex};
use tempfile::TempDir;

fn wizard_chunks() -> Vec<Chunk> {
    vec![
        Chunk::new("Harry Potter lives in London").with_meta("source_file", "book1.pdf"),
        Chunk::new("Hermione studies at Hogwarts").with_meta("source_file", "book2.pdf").with_meta("page_num", "12"),
        Chunk::new("Ron loves chess").with_meta("source_file", "book3.pdf"),
    ]
}

#[test]
fn hogwarts_matches_only_the_second_chunk() {
    let tmp = TempDir::new().unwrap();
    let index = SparseIndex::open(tmp.path(), Bm25Params::default()).expect("open");
    index.build(&wizard_chunks()).expect("build");

    let hits = index.search("Hogwarts", 3).expect("search");
    assert_eq!(hits.len(), 1, "documents without overlap are excluded even when top_k is unmet");
    assert_eq!(hits[0].0, 1);
    assert!(hits[0].1 > 0.0);
}

#[test]
fn resolve_rebuilds_lowercased_text_and_metadata() {
    let tmp = TempDir::new().unwrap();
    let index = SparseIndex::open(tmp.path(), Bm25Params::default()).expect("open");
    index.build(&wizard_chunks()).expect("build");

    let docs = index.resolve(&[1, 7]).expect("resolve");
    assert_eq!(docs.len(), 1, "out-of-range positions are skipped");
    assert_eq!(docs[0].text, "hermione studies at hogwarts");
    assert_eq!(docs[0].doc_id, "1");
    assert_eq!(docs[0].metadata.get("page_num"), Some(&MetaValue::Text("12".to_string())));
    assert_eq!(docs[0].metadata.get("chunk_id"), Some(&MetaValue::Text("0".to_string())));
}

#[test]
fn reload_uses_saved_hyperparameters() {
    let tmp = TempDir::new().unwrap();
    let built_with = Bm25Params { k1: 1.2, b: 0.5, epsilon: 0.1 };
    let before = {
        let index = SparseIndex::open(tmp.path(), built_with).expect("open");
        index.build(&wizard_chunks()).expect("build");
        index.search("potter london chess", 3).expect("search")
    };

    let reopened = SparseIndex::open(tmp.path(), Bm25Params::default()).expect("reopen");
    assert_eq!(reopened.len(), 3);
    assert_eq!(reopened.params(), built_with);
    assert_eq!(reopened.search("potter london chess", 3).expect("search"), before);
}

#[test]
fn reload_reproduces_scores_of_common_terms() {
    let tmp = TempDir::new().unwrap();
    let chunks: Vec<Chunk> = (0..30).map(|i| Chunk::new(format!("Studio lot{i} area{} zone{}", i % 5, i % 4))).collect();
    let before = {
        let index = SparseIndex::open(tmp.path(), Bm25Params::default()).expect("open");
        index.build(&chunks).expect("build");
        index.search("studio zone1", 30).expect("search")
    };
    assert_eq!(before.len(), 30, "a term in every chunk still scores through the idf floor");

    for _ in 0..20 {
        let reopened = SparseIndex::open(tmp.path(), Bm25Params::default()).expect("reopen");
        let after = reopened.search("studio zone1", 30).expect("search");
        let bits = |hits: &[(usize, f32)]| hits.iter().map(|(p, s)| (*p, s.to_bits())).collect::<Vec<_>>();
        assert_eq!(bits(&after), bits(&before));
    }
}

#[test]
fn corrupt_index_file_starts_empty() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join(docqa_sparse::index::INDEX_FILE), b"{not json").unwrap();

    let index = SparseIndex::open(tmp.path(), Bm25Params::default()).expect("open fails soft");
    assert!(index.is_empty());
    assert!(matches!(index.search("anything", 5), Err(Error::IndexUnavailable(_))));
}

#[test]
fn unbuilt_index_is_unavailable() {
    let tmp = TempDir::new().unwrap();
    let index = SparseIndex::open(tmp.path(), Bm25Params::default()).expect("open");
    assert!(matches!(index.search("castle", 5), Err(Error::IndexUnavailable(_))));
    assert!(index.search("castle", 0).expect("zero top_k").is_empty());
}

#[test]
fn empty_build_is_rejected_and_keeps_published_index() {
    let tmp = TempDir::new().unwrap();
    let index = SparseIndex::open(tmp.path(), Bm25Params::default()).expect("open");
    index.build(&wizard_chunks()).expect("build");

    assert!(matches!(index.build(&[]), Err(Error::IndexBuild(_))));
    assert_eq!(index.len(), 3);
    assert_eq!(index.search("chess", 3).expect("search")[0].0, 2);
}

#[test]
fn rebuild_replaces_everything() {
    let tmp = TempDir::new().unwrap();
    let index = SparseIndex::open(tmp.path(), Bm25Params::default()).expect("open");
    index.build(&wizard_chunks()).expect("build");
    index
        .build(&[Chunk::new("Backlot tour daily"), Chunk::new("Sound stage seven"), Chunk::new("Gate two parking")])
        .expect("rebuild");

    assert_eq!(index.len(), 3);
    assert!(index.search("hogwarts", 5).expect("search").is_empty());
    assert_eq!(index.search("stage", 5).expect("search")[0].0, 1);
}

#[test]
fn clear_removes_persisted_file() {
    let tmp = TempDir::new().unwrap();
    let index = SparseIndex::open(tmp.path(), Bm25Params::default()).expect("open");
    index.build(&wizard_chunks()).expect("build");
    assert!(index.index_path().exists());

    index.clear().expect("clear");
    assert!(index.is_empty());
    assert!(!index.index_path().exists());
    assert!(SparseIndex::open(tmp.path(), Bm25Params::default()).expect("reopen").is_empty());
}

#[test]
fn readers_never_see_a_partial_rebuild() {
    let tmp = TempDir::new().unwrap();
    let index = Arc::new(SparseIndex::open(tmp.path(), Bm25Params::default()).expect("open"));
    let small: Vec<Chunk> = (0..3).map(|i| Chunk::new(format!("castle {i} north{i} tower{i} gate{i}"))).collect();
    let large: Vec<Chunk> = (0..50).map(|i| Chunk::new(format!("castle moat {i}"))).collect();
    index.build(&small).expect("build");

    let writer = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            for round in 0..10 {
                let chunks = if round % 2 == 0 { &large } else { &small };
                index.build(chunks).expect("rebuild");
            }
        })
    };
    for _ in 0..200 {
        let n = index.len();
        assert!(n == 3 || n == 50, "observed partial index of {n} documents");
        let hits = index.search("castle", 100).expect("search");
        assert!(hits.len() == 3 || hits.len() == 50);
    }
    writer.join().unwrap();
}
