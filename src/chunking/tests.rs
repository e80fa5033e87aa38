use super::*;
use crate::index::ChunkMetadata;

fn page(text: &str) -> CleanedPage {
    CleanedPage {
        text: text.to_string(),
        metadata: ChunkMetadata::new(),
    }
}

#[test]
fn qna_format_detection() {
    assert!(is_qna_format("Q.1 What are closures?"));
    assert!(is_qna_format("Question 12: event loops"));
    assert!(is_qna_format("How does borrowing work"));
    assert!(is_qna_format("some line\nWhat follows here"));
    assert!(is_qna_format("does this end with a question mark?"));
    assert!(is_qna_format("Answer: the borrow checker"));

    assert!(!is_qna_format(""));
    assert!(!is_qna_format("plain prose without any questions."));
}

#[test]
fn detect_qna_threshold_met() {
    // Pages 1, 3, 5 are question-like; 3 of 10 meets the threshold
    let pages: Vec<CleanedPage> = (0..10)
        .map(|i| {
            if i % 2 == 0 && i < 6 {
                page(&format!("Q.{} what is this?", i + 1))
            } else {
                page("plain prose content.")
            }
        })
        .collect();
    assert!(detect_qna_in_pages(&pages));
}

#[test]
fn detect_qna_threshold_not_met() {
    let mut pages = vec![page("Q.1 first?"), page("Q.2 second?")];
    pages.extend((0..8).map(|_| page("plain prose content.")));
    assert!(!detect_qna_in_pages(&pages));
}

#[test]
fn detect_qna_too_few_pages() {
    let pages = vec![page("Q.1 first?"), page("Q.2 second?")];
    assert!(!detect_qna_in_pages(&pages));
}

#[test]
fn detect_qna_only_checks_first_ten_pages() {
    let mut pages: Vec<CleanedPage> = (0..10).map(|_| page("plain prose.")).collect();
    pages.extend((0..3).map(|i| page(&format!("Q.{} late question?", i + 1))));
    assert!(!detect_qna_in_pages(&pages));
}

#[test]
fn sliding_window_covers_all_tokens() {
    let text = (0..100).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
    let chunker = SlidingWindowChunker::new(40, 10);
    let chunks = chunker.chunk(&text);

    // step = 30: windows start at 0, 30, 60, 90
    assert_eq!(chunks.len(), 4);
    assert!(chunks[0].starts_with("w0 "));
    assert!(chunks[1].starts_with("w30 "));
    assert!(chunks[3].ends_with("w99"));
}

#[test]
fn sliding_window_overlap_repeats_tokens() {
    let text = (0..50).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
    let chunks = SlidingWindowChunker::new(30, 10).chunk(&text);

    assert_eq!(chunks.len(), 3);
    assert!(chunks[0].contains("w29"));
    assert!(chunks[1].contains("w29"), "overlap region should repeat");
}

#[test]
fn sliding_window_empty_text() {
    assert!(SlidingWindowChunker::default().chunk("").is_empty());
}

#[test]
fn recursive_small_text_single_chunk() {
    let chunker = RecursiveChunker::default();
    let chunks = chunker.chunk("short text");
    assert_eq!(chunks, vec!["short text".to_string()]);
}

#[test]
fn recursive_empty_text() {
    assert!(RecursiveChunker::default().chunk("").is_empty());
}

#[test]
fn recursive_splits_on_paragraphs() {
    let para = "sentence one here. sentence two follows.".repeat(4);
    let text = format!("{para}\n\n{para}\n\n{para}");
    let chunker = RecursiveChunker::new(200, 0, 50);
    let chunks = chunker.chunk(&text);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(!chunk.is_empty());
    }
}

#[test]
fn recursive_respects_max_size() {
    let text = "word ".repeat(600);
    let chunker = RecursiveChunker::new(300, 50, 50);
    let chunks = chunker.chunk(&text);

    assert!(chunks.len() > 1);
    // Word-level splitting keeps every chunk within the limit
    for chunk in &chunks {
        assert!(chunk.chars().count() <= 300, "chunk too large: {}", chunk.chars().count());
    }
}

#[test]
fn chunking_config_defaults() {
    let config = ChunkingConfig::default();
    assert_eq!(config.window_size, 600);
    assert_eq!(config.window_overlap, 200);
    assert_eq!(config.chunk_size, 1000);
    assert_eq!(config.chunk_overlap, 200);
    assert_eq!(config.min_chunk_size, 100);

    let sliding = SlidingWindowChunker::from(&config);
    assert_eq!(sliding.chunk_size, 600);
    let recursive = RecursiveChunker::from(&config);
    assert_eq!(recursive.chunk_size, 1000);
}
