use super::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).expect("should write test file");
}

#[test]
fn prose_document_uses_recursive_strategy() {
    let dir = TempDir::new().expect("should create temp dir");
    write(
        &dir,
        "notes.txt",
        "This is plain prose content about retrieval systems and their design.",
    );

    let records = process_documents(dir.path(), &ChunkingConfig::default())
        .expect("processing should succeed");

    assert!(!records.is_empty());
    for record in &records {
        assert_eq!(record.metadata.get("chunking_strategy"), Some(&json!("recursive")));
        assert_eq!(record.metadata.get("filename"), Some(&json!("notes.txt")));
        assert_eq!(record.metadata.get("source_document"), Some(&json!("notes.txt")));
    }
}

#[test]
fn qna_document_uses_sliding_window() {
    let dir = TempDir::new().expect("should create temp dir");
    // Three of the first pages are Q&A-formatted
    let pages = [
        "Q.1 What are closures in programming?",
        "Q.2 How does the event loop work?",
        "Q.3 Why is hoisting confusing?",
        "regular prose page",
    ];
    write(&dir, "interview.txt", &pages.join("\u{c}"));

    let records = process_documents(dir.path(), &ChunkingConfig::default())
        .expect("processing should succeed");

    assert!(!records.is_empty());
    for record in &records {
        assert_eq!(record.metadata.get("chunking_strategy"), Some(&json!("qna")));
    }
}

#[test]
fn chunk_ids_restart_per_document() {
    let dir = TempDir::new().expect("should create temp dir");
    write(&dir, "a.txt", "first document content");
    write(&dir, "b.txt", "second document content");

    let records = process_documents(dir.path(), &ChunkingConfig::default())
        .expect("processing should succeed");

    let first_ids: Vec<_> = records
        .iter()
        .filter(|r| r.metadata.get("filename") == Some(&json!("a.txt")))
        .map(|r| r.metadata.get("chunk_id").cloned())
        .collect();
    let second_ids: Vec<_> = records
        .iter()
        .filter(|r| r.metadata.get("filename") == Some(&json!("b.txt")))
        .map(|r| r.metadata.get("chunk_id").cloned())
        .collect();

    assert_eq!(first_ids.first(), Some(&Some(json!(1))));
    assert_eq!(second_ids.first(), Some(&Some(json!(1))));
}

#[test]
fn page_metadata_merged_into_chunk_metadata() {
    let dir = TempDir::new().expect("should create temp dir");
    write(&dir, "doc.txt", "page one content here\u{c}page two content here");

    let records = process_documents(dir.path(), &ChunkingConfig::default())
        .expect("processing should succeed");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].metadata.get("page_number"), Some(&json!(1)));
    assert_eq!(records[1].metadata.get("page_number"), Some(&json!(2)));
    assert!(records[0].metadata.get("char_count").is_some());
    assert!(records[0].metadata.get("line_count").is_some());
}

#[test]
fn empty_directory_produces_no_records() {
    let dir = TempDir::new().expect("should create temp dir");
    let records = process_documents(dir.path(), &ChunkingConfig::default())
        .expect("processing should succeed");
    assert!(records.is_empty());
}
