use super::*;
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).expect("should write test file");
}

#[test]
fn loads_text_and_markdown() {
    let dir = TempDir::new().expect("should create temp dir");
    write(&dir, "a.txt", "plain text content");
    write(&dir, "b.md", "# heading\n\nmarkdown content");

    let docs = DocumentLoader::new(dir.path())
        .load_documents()
        .expect("load should succeed");

    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].filename, "a.txt");
    assert_eq!(docs[0].text, "plain text content");
    assert_eq!(docs[1].filename, "b.md");
}

#[test]
fn unsupported_extensions_skipped() {
    let dir = TempDir::new().expect("should create temp dir");
    write(&dir, "doc.txt", "keep me");
    write(&dir, "image.png", "binary-ish");
    write(&dir, "archive.zip", "nope");

    let docs = DocumentLoader::new(dir.path())
        .load_documents()
        .expect("load should succeed");

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].filename, "doc.txt");
}

#[test]
fn invalid_json_skipped_batch_continues() {
    let dir = TempDir::new().expect("should create temp dir");
    write(&dir, "bad.json", "{not json");
    write(&dir, "good.txt", "still loaded");

    let docs = DocumentLoader::new(dir.path())
        .load_documents()
        .expect("load should succeed");

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].filename, "good.txt");
}

#[test]
fn json_flattened_to_text() {
    let dir = TempDir::new().expect("should create temp dir");
    write(&dir, "data.json", r#"{"topic": "closures", "tags": ["js", "fp"], "year": 2021}"#);

    let docs = DocumentLoader::new(dir.path())
        .load_documents()
        .expect("load should succeed");

    assert_eq!(docs.len(), 1);
    let text = &docs[0].text;
    assert!(text.contains("topic : closures"));
    assert!(text.contains("js fp"));
    assert!(text.contains("year : 2021"));
}

#[test]
fn html_tags_stripped() {
    let dir = TempDir::new().expect("should create temp dir");
    write(
        &dir,
        "page.html",
        "<html><body><h1>Title</h1><p>Paragraph text</p></body></html>",
    );

    let docs = DocumentLoader::new(dir.path())
        .load_documents()
        .expect("load should succeed");

    assert_eq!(docs.len(), 1);
    assert!(docs[0].text.contains("Title"));
    assert!(docs[0].text.contains("Paragraph text"));
    assert!(!docs[0].text.contains("<h1>"));
}

#[test]
fn empty_directory_yields_no_documents() {
    let dir = TempDir::new().expect("should create temp dir");
    let docs = DocumentLoader::new(dir.path())
        .load_documents()
        .expect("load should succeed");
    assert!(docs.is_empty());
}

#[test]
fn missing_directory_is_an_error() {
    let dir = TempDir::new().expect("should create temp dir");
    let missing = dir.path().join("does-not-exist");
    let result = DocumentLoader::new(&missing).load_documents();
    assert!(result.is_err());
}
