//! Text cleaning for extracted documents: OCR/CID artifact removal,
//! repeated header/footer detection across pages, and page- and
//! document-level metadata extraction.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::LazyLock;

use fancy_regex::Regex;
use serde_json::json;

use crate::index::ChunkMetadata;

/// Form-feed page-break marker embedded by loaders.
pub const PAGE_DELIMITER: &str = "\u{c}";

/// One cleaned page with its page-level metadata (`page_number`,
/// `char_count`, `line_count`, and `header`/`footer`/`section_title` when
/// detected).
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedPage {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A cleaned document: pages plus document-level metadata (`header`,
/// `footer`, `title`, `author`, `year` when detected).
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedDocument {
    pub pages: Vec<CleanedPage>,
    pub metadata: ChunkMetadata,
}

struct CleaningPatterns {
    cid: Regex,
    control_chars: Regex,
    hyphen_breaks: Regex,
    multi_whitespace: Regex,
    boilerplate: Regex,
    orphan_chars: Regex,
    url: Regex,
    page_numbers: Regex,
    bullet_noise: Regex,
    unicode_noise: Regex,
    repeated_punctuation: Regex,
    fa_za_artifact: Regex,
    weird_symbols: Regex,
    cid_like_symbols: Regex,
    section_prefix: Regex,
    difficulty_label: Regex,
    question_label: Regex,
    author_line: Regex,
    year: Regex,
}

static PATTERNS: LazyLock<CleaningPatterns> = LazyLock::new(|| {
    let compile = |p: &str| Regex::new(p).expect("static cleaning pattern");
    CleaningPatterns {
        cid: compile(r"\(cid:\d+\)"),
        control_chars: compile(r"[\x00-\x1f\x7f-\x9f]"),
        hyphen_breaks: compile(r"(\w+)-\s*\n\s*(\w+)"),
        multi_whitespace: compile(r"\s+"),
        boilerplate: compile(r"={3,}|-{3,}|\*{3,}"),
        orphan_chars: compile(r"\s+[A-Za-z]\s+"),
        url: compile(r"www\.\S+\.com"),
        page_numbers: compile(r"(?m)^\s*\d+\s*$"),
        bullet_noise: compile(r"[\u{2022}\u{b7}\u{2219}\u{25cf}\u{25cb}\u{25aa}\u{25ab}\u{25ba}\u{25c4}]"),
        unicode_noise: compile(r"[^\x00-\x7F]+"),
        repeated_punctuation: compile(r"([!?.,])\1+"),
        fa_za_artifact: compile(r"\b[FZt]A\s+"),
        weird_symbols: compile(r"[\u{ac}\u{c4}\u{2018}\u{2026}\u{b2}\u{d9}\u{f6}]"),
        cid_like_symbols: compile(r"[\u{a9}\u{ae}\u{2122}\u{a7}\u{b6}]"),
        section_prefix: compile(r"(?i)^(CHAPTER|SECTION|PART|TOPIC)\s+\d+"),
        difficulty_label: compile(r"(?i)^(EASY|MEDIUM|HARD|BEGINNER|INTERMEDIATE|ADVANCED)\b"),
        question_label: compile(r"^Q\.?\d+"),
        author_line: compile(r"(?i)by\s+([A-Za-z\.\s]+)(?:\s+and\s+([A-Za-z\.\s]+))?"),
        year: compile(r"\b(19|20)\d{2}\b"),
    }
});

/// Clean a raw document, split it into pages on the form-feed marker, and
/// extract page- and document-level metadata.
#[inline]
pub fn clean_with_metadata(text: &str) -> CleanedDocument {
    if text.is_empty() {
        return CleanedDocument {
            pages: Vec::new(),
            metadata: ChunkMetadata::new(),
        };
    }

    let pages: Vec<&str> = if text.contains(PAGE_DELIMITER) {
        text.split(PAGE_DELIMITER).collect()
    } else {
        vec![text]
    };

    // First pass: first/last line of each non-empty page, for repeated
    // header/footer detection
    let mut first_lines = Vec::new();
    let mut last_lines = Vec::new();
    for page in &pages {
        let lines: Vec<&str> = page.trim().lines().collect();
        if lines.is_empty() {
            continue;
        }
        first_lines.push(lines[0].trim().to_string());
        last_lines.push(lines[lines.len() - 1].trim().to_string());
    }

    let global_header = find_repeated(&first_lines, 3);
    let global_footer = find_repeated(&last_lines, 3);

    let mut cleaned_pages = Vec::new();
    for (page_idx, page) in pages.iter().enumerate() {
        let page_number = page_idx + 1;
        let lines: Vec<&str> = page.trim().lines().collect();
        if lines.is_empty() {
            continue;
        }

        let cleaned_lines: Vec<String> = lines
            .iter()
            .map(|line| clean_line(line))
            .filter(|line| !line.trim().is_empty())
            .collect();
        let cleaned_text = cleaned_lines.join("\n");

        let mut metadata = ChunkMetadata::new();
        metadata.insert("page_number".to_string(), json!(page_number));
        metadata.insert("char_count".to_string(), json!(cleaned_text.chars().count()));
        metadata.insert("line_count".to_string(), json!(cleaned_lines.len()));

        if let Some(header) = &global_header {
            if first_lines.get(page_number - 1) == Some(header) {
                metadata.insert("header".to_string(), json!(header));
            }
        }
        if let Some(footer) = &global_footer {
            if last_lines.get(page_number - 1) == Some(footer) {
                metadata.insert("footer".to_string(), json!(footer));
            }
        }
        if let Some(title) = detect_section_title(
            &cleaned_lines,
            global_header.as_deref(),
            global_footer.as_deref(),
        ) {
            metadata.insert("section_title".to_string(), json!(title));
        }

        cleaned_pages.push(CleanedPage {
            text: cleaned_text,
            metadata,
        });
    }

    let metadata =
        extract_global_metadata(&pages, global_header.as_deref(), global_footer.as_deref());

    CleanedDocument {
        pages: cleaned_pages,
        metadata,
    }
}

/// Apply the artifact-removal cascade to a single line.
fn clean_line(line: &str) -> String {
    let p = &*PATTERNS;

    // CID markers first, then the symbol artifacts they tend to travel with
    let text = p.cid.replace_all(line, " ");
    let text = p.fa_za_artifact.replace_all(&text, " ");
    let text = p.weird_symbols.replace_all(&text, " ");
    let text = p.cid_like_symbols.replace_all(&text, " ");

    let text = p.control_chars.replace_all(&text, " ");
    let text = p.unicode_noise.replace_all(&text, " ");
    let text = p.bullet_noise.replace_all(&text, " ");
    let text = p.hyphen_breaks.replace_all(&text, "$1$2");
    let text = p.boilerplate.replace_all(&text, " ");
    let text = p.url.replace_all(&text, " ");
    let text = p.page_numbers.replace_all(&text, " ");
    let text = p.orphan_chars.replace_all(&text, " ");
    let text = p.repeated_punctuation.replace_all(&text, "$1");

    p.multi_whitespace.replace_all(&text, " ").trim().to_string()
}

/// A line counts as a repeated header/footer when it appears on at least
/// `min_repeats` pages.
fn find_repeated(lines: &[String], min_repeats: usize) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for line in lines {
        if !line.is_empty() && line.trim().chars().count() > 2 {
            *counts.entry(line.as_str()).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .filter(|(_, count)| *count >= min_repeats)
        .map(|(line, _)| line.to_string())
}

/// Python-style `str.isupper`: at least one cased character and no
/// lowercase ones.
fn is_all_upper(text: &str) -> bool {
    let mut has_cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

fn detect_section_title(
    lines: &[String],
    header: Option<&str>,
    footer: Option<&str>,
) -> Option<String> {
    let p = &*PATTERNS;

    for line in lines.iter().take(5) {
        let clean = line.trim();
        if clean.is_empty() || Some(clean) == header || Some(clean) == footer {
            continue;
        }

        let char_count = clean.chars().count();
        let is_section = (is_all_upper(clean) && (2..=50).contains(&char_count))
            || p.section_prefix.is_match(clean).unwrap_or(false)
            || p.difficulty_label.is_match(clean).unwrap_or(false)
            || p.question_label.is_match(clean).unwrap_or(false);

        if is_section {
            return Some(clean.to_string());
        }
    }
    None
}

fn extract_global_metadata(
    pages: &[&str],
    header: Option<&str>,
    footer: Option<&str>,
) -> ChunkMetadata {
    let p = &*PATTERNS;
    let mut metadata = ChunkMetadata::new();

    if let Some(header) = header {
        metadata.insert("header".to_string(), json!(header));
    }
    if let Some(footer) = footer {
        metadata.insert("footer".to_string(), json!(footer));
    }

    let Some(first_page) = pages.first() else {
        return metadata;
    };
    let first_page_lines: Vec<&str> = first_page.lines().collect();

    // Title: early substantial line that is not a header/footer, not an
    // author credit, and not ALL CAPS
    for line in first_page_lines.iter().take(5) {
        let clean = line.trim();
        if !clean.is_empty()
            && Some(clean) != header
            && Some(clean) != footer
            && !clean.to_lowercase().contains("by")
            && clean.chars().count() > 5
            && !is_all_upper(clean)
        {
            metadata.insert("title".to_string(), json!(clean));
            break;
        }
    }

    for line in first_page_lines.iter().take(10) {
        if let Ok(Some(caps)) = p.author_line.captures(line) {
            let mut authors = Vec::new();
            if let Some(first) = caps.get(1) {
                authors.push(first.as_str().trim().to_string());
            }
            if let Some(second) = caps.get(2) {
                authors.push(second.as_str().trim().to_string());
            }
            if !authors.is_empty() {
                metadata.insert("author".to_string(), json!(authors.join(" and ")));
                break;
            }
        }
    }

    for line in first_page_lines.iter().take(10) {
        if let Ok(Some(year)) = p.year.find(line) {
            metadata.insert("year".to_string(), json!(year.as_str()));
            break;
        }
    }

    metadata
}
