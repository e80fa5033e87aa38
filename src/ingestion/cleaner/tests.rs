use super::*;

#[test]
fn empty_input() {
    let doc = clean_with_metadata("");
    assert!(doc.pages.is_empty());
    assert!(doc.metadata.is_empty());
}

#[test]
fn cid_artifacts_removed() {
    let doc = clean_with_metadata("This operator returns (cid:7) a value (cid:27) here");
    assert_eq!(doc.pages.len(), 1);
    let text = &doc.pages[0].text;
    assert!(!text.contains("(cid:"));
    assert!(text.contains("This operator returns"));
}

#[test]
fn whitespace_collapsed_and_symbols_stripped() {
    let doc = clean_with_metadata("bullet \u{2022} point   with\tgaps!!!");
    let text = &doc.pages[0].text;
    assert!(!text.contains('\u{2022}'));
    assert!(!text.contains("  "));
    assert!(text.contains("point with"));
    // Repeated punctuation squashed to one
    assert!(text.ends_with("gaps!"));
}

#[test]
fn pages_split_on_form_feed() {
    let doc = clean_with_metadata("first page text here\u{c}second page text here");
    assert_eq!(doc.pages.len(), 2);
    assert_eq!(doc.pages[0].metadata.get("page_number"), Some(&serde_json::json!(1)));
    assert_eq!(doc.pages[1].metadata.get("page_number"), Some(&serde_json::json!(2)));
}

#[test]
fn empty_pages_skipped() {
    let doc = clean_with_metadata("first page\u{c}\u{c}third page");
    assert_eq!(doc.pages.len(), 2);
    // Page numbering still reflects the original positions
    assert_eq!(doc.pages[1].metadata.get("page_number"), Some(&serde_json::json!(3)));
}

#[test]
fn page_counts_recorded() {
    let doc = clean_with_metadata("line one\nline two");
    let metadata = &doc.pages[0].metadata;
    assert_eq!(metadata.get("line_count"), Some(&serde_json::json!(2)));
    assert!(metadata.get("char_count").is_some());
}

#[test]
fn repeated_header_and_footer_detected() {
    let page = "ACME Corp Handbook\nsome body content for this page\nconfidential";
    let text = [page, page, page, page].join("\u{c}");
    let doc = clean_with_metadata(&text);

    assert_eq!(doc.metadata.get("header"), Some(&serde_json::json!("ACME Corp Handbook")));
    assert_eq!(doc.metadata.get("footer"), Some(&serde_json::json!("confidential")));
    assert_eq!(
        doc.pages[0].metadata.get("header"),
        Some(&serde_json::json!("ACME Corp Handbook"))
    );
}

#[test]
fn header_requires_three_repeats() {
    let text = "Heading One\nbody\u{c}Heading Two\nbody";
    let doc = clean_with_metadata(text);
    assert!(doc.metadata.get("header").is_none());
}

#[test]
fn section_title_from_all_caps_line() {
    let doc = clean_with_metadata("INTRODUCTION\nregular body text follows here");
    assert_eq!(
        doc.pages[0].metadata.get("section_title"),
        Some(&serde_json::json!("INTRODUCTION"))
    );
}

#[test]
fn section_title_from_question_label() {
    let doc = clean_with_metadata("Q.1 explain closures\nmore body text");
    assert_eq!(
        doc.pages[0].metadata.get("section_title"),
        Some(&serde_json::json!("Q.1 explain closures"))
    );
}

#[test]
fn title_author_year_extracted() {
    let doc = clean_with_metadata(
        "Practical Retrieval Systems\nwritten by Jane Doe\npublished 2021\nbody text",
    );
    assert_eq!(doc.metadata.get("title"), Some(&serde_json::json!("Practical Retrieval Systems")));
    assert_eq!(doc.metadata.get("year"), Some(&serde_json::json!("2021")));
    let author = doc.metadata.get("author").and_then(serde_json::Value::as_str);
    assert!(author.is_some_and(|a| a.contains("Jane Doe")));
}

#[test]
fn all_caps_line_not_a_title() {
    let doc = clean_with_metadata("SHOUTING HEADER LINE\nActual Document Title\nbody");
    assert_eq!(doc.metadata.get("title"), Some(&serde_json::json!("Actual Document Title")));
}

#[test]
fn urls_and_page_number_lines_removed() {
    let doc = clean_with_metadata("visit www.example.com for details\nsome more body text here");
    let text = &doc.pages[0].text;
    assert!(!text.contains("www.example.com"));
    assert!(text.contains("visit"));
    assert!(text.contains("for details"));
}
