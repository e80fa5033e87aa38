//! Query-side processing: cleaning, metadata-facet extraction, intent
//! analysis, and embedding into a [`QueryContext`].


use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::Result;
use crate::embeddings::OllamaClient;
use crate::index::ChunkMetadata;
use crate::retriever::QueryContext;

/// Facet keyword tables; first matching keyword wins per facet.
const DOC_TYPES: &[(&str, &[&str])] = &[
    ("official", &["official", "documentation", "docs", "manual", "spec"]),
    ("tutorial", &["tutorial", "guide", "walkthrough", "how-to", "lesson"]),
    ("example", &["example", "sample", "snippet", "template"]),
    ("reference", &["reference", "cheatsheet", "api reference", "syntax"]),
    ("faq", &["faq", "frequently asked"]),
    ("research", &["research", "paper", "study", "analysis"]),
    ("news", &["news", "article", "blog", "update", "release notes"]),
    ("report", &["report", "case study", "whitepaper"]),
];

const DOMAINS: &[(&str, &[&str])] = &[
    ("technology", &["software", "ai", "ml", "cloud", "api", "database", "programming", "coding"]),
    ("science", &["biology", "physics", "chemistry", "neuroscience"]),
    ("health", &["medical", "doctor", "medicine", "disease", "treatment"]),
    ("finance", &["banking", "investment", "trading", "economy"]),
    ("legal", &["law", "regulation", "compliance"]),
    ("education", &["curriculum", "learning", "school", "university"]),
    ("business", &["marketing", "sales", "startup", "management"]),
    ("general", &["general", "overview"]),
];

static QUESTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Q\.\d+",
        r"(?i)Question\s*\d+",
        r"(?i)^\s*what\s+",
        r"(?i)^\s*how\s+",
        r"(?i)^\s*why\s+",
        r"(?i)^\s*where\s+",
        r"(?i)^\s*when\s+",
        r"(?i)^\s*who\s+",
        r"\?$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static question pattern"))
    .collect()
});

static ANSWER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(?i)Answer:", r"(?i)Solution:", r"(?i)Explanation:"]
        .iter()
        .map(|p| Regex::new(p).expect("static answer pattern"))
        .collect()
});

static HOWTO_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*how\s+").expect("static how-to pattern"));

static NON_QUERY_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s?]").expect("static query-cleaning pattern"));

static MULTI_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));

/// Builds a [`QueryContext`] for a raw user query: cleans it, extracts
/// metadata facet filters and intent flags, and embeds the cleaned text.
pub struct QueryProcessor<'a> {
    client: &'a OllamaClient,
}

impl<'a> QueryProcessor<'a> {
    #[inline]
    pub fn new(client: &'a OllamaClient) -> Self {
        Self { client }
    }

    #[inline]
    pub fn process(&self, query: &str) -> Result<QueryContext> {
        let cleaned_query = clean_query(query);
        let metadata_filters = extract_metadata_filters(query);
        let query_intent = analyze_query_intent(query);

        debug!(
            "Processed query '{}' -> '{}' ({} filters, {} intent flags set)",
            query,
            cleaned_query,
            metadata_filters.len(),
            query_intent.values().filter(|&&v| v).count()
        );

        let embedding = self.client.embed_one(&cleaned_query)?;

        Ok(QueryContext {
            original_query: query.to_string(),
            cleaned_query,
            embedding,
            metadata_filters,
            query_intent,
        })
    }
}

/// Clean a query for embedding: collapse whitespace, strip punctuation
/// except `?`, lowercase.
#[inline]
pub fn clean_query(query: &str) -> String {
    let cleaned = query.trim();
    let cleaned = MULTI_WHITESPACE.replace_all(cleaned, " ");
    let cleaned = NON_QUERY_CHARS.replace_all(&cleaned, "");
    let cleaned = cleaned.to_lowercase();
    MULTI_WHITESPACE.replace_all(&cleaned, " ").trim().to_string()
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| haystack.contains(kw))
}

fn first_facet_match(haystack: &str, table: &[(&str, &[&str])]) -> Option<String> {
    table
        .iter()
        .find(|(_, keywords)| contains_any(haystack, keywords))
        .map(|(facet, _)| (*facet).to_string())
}

/// Extract flat metadata facet filters from a raw query. Every facet is a
/// single categorical value; the first matching keyword wins.
#[inline]
pub fn extract_metadata_filters(query: &str) -> ChunkMetadata {
    let q = query.to_lowercase();
    let mut filters = ChunkMetadata::new();

    if let Some(doc_type) = first_facet_match(&q, DOC_TYPES) {
        filters.insert("doc_type".to_string(), Value::String(doc_type));
    }

    if contains_any(&q, &["latest", "recent", "current", "new"]) {
        filters.insert("time".to_string(), Value::String("recent".to_string()));
    } else if contains_any(&q, &["old", "archived", "legacy", "historical"]) {
        filters.insert("time".to_string(), Value::String("historical".to_string()));
    }

    if contains_any(&q, &["basic", "beginner", "introduction", "getting started"]) {
        filters.insert("complexity".to_string(), Value::String("beginner".to_string()));
    } else if contains_any(&q, &["intermediate", "moderate"]) {
        filters.insert("complexity".to_string(), Value::String("intermediate".to_string()));
    } else if contains_any(&q, &["advanced", "expert", "comprehensive", "deep"]) {
        filters.insert("complexity".to_string(), Value::String("advanced".to_string()));
    }

    let intent = if contains_any(&q, &["what is", "define", "definition"]) {
        Some("definition")
    } else if contains_any(&q, &["how to", "steps", "procedure", "tutorial"]) {
        Some("how-to")
    } else if contains_any(&q, &["vs", "versus", "compare", "difference"]) {
        Some("comparison")
    } else if contains_any(&q, &["example", "sample", "code"]) {
        Some("example")
    } else if contains_any(&q, &["error", "fix", "troubleshoot", "problem", "issue"]) {
        Some("troubleshooting")
    } else if contains_any(&q, &["install", "setup", "configure"]) {
        Some("installation")
    } else if contains_any(&q, &["deploy", "production", "hosting"]) {
        Some("deployment")
    } else if contains_any(&q, &["optimize", "performance", "scaling"]) {
        Some("optimization")
    } else if contains_any(&q, &["security", "vulnerability", "auth"]) {
        Some("security")
    } else {
        None
    };
    if let Some(intent) = intent {
        filters.insert("intent".to_string(), Value::String(intent.to_string()));
    }

    if let Some(domain) = first_facet_match(&q, DOMAINS) {
        filters.insert("domain".to_string(), Value::String(domain));
    }

    let audience = if contains_any(&q, &["student", "beginner", "learner"]) {
        "students"
    } else if contains_any(&q, &["professional", "engineer", "developer", "manager"]) {
        "professionals"
    } else if contains_any(&q, &["research", "scholar", "scientist"]) {
        "researchers"
    } else {
        "general"
    };
    filters.insert("audience".to_string(), Value::String(audience.to_string()));

    let format = if q.contains("pdf") {
        Some("pdf")
    } else if contains_any(&q, &["ppt", "presentation"]) {
        Some("ppt")
    } else if contains_any(&q, &["doc", "word"]) {
        Some("doc")
    } else if contains_any(&q, &["markdown", "md"]) {
        Some("markdown")
    } else if contains_any(&q, &["html", "webpage"]) {
        Some("html")
    } else if contains_any(&q, &["blog", "article"]) {
        Some("blog")
    } else {
        None
    };
    if let Some(format) = format {
        filters.insert("format".to_string(), Value::String(format.to_string()));
    }

    filters
}

fn matches_any(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|p| p.is_match(text))
}

/// Boolean intent flags for a raw query, each independently derived from
/// keyword and pattern matches.
#[inline]
pub fn analyze_query_intent(query: &str) -> BTreeMap<String, bool> {
    let q = query.to_lowercase();

    let mut intent = BTreeMap::new();
    intent.insert(
        "is_definition".to_string(),
        contains_any(&q, &["what is", "define", "definition", "meaning of", "explain", "describe"])
            || matches_any(&QUESTION_PATTERNS, query),
    );
    intent.insert(
        "is_howto".to_string(),
        contains_any(&q, &["how to", "how do i", "steps to", "procedure", "guide to"])
            || HOWTO_START.is_match(query),
    );
    intent.insert(
        "is_comparison".to_string(),
        contains_any(&q, &["vs", "versus", "compare", "difference", "advantages", "disadvantages"]),
    );
    intent.insert(
        "is_example".to_string(),
        contains_any(&q, &["example", "sample", "code snippet", "template"]),
    );
    intent.insert(
        "is_troubleshooting".to_string(),
        contains_any(&q, &["error", "fix", "issue", "problem", "bug", "troubleshoot", "solution"])
            || matches_any(&ANSWER_PATTERNS, query),
    );
    intent.insert(
        "is_explanation".to_string(),
        contains_any(&q, &["explain", "overview", "summary", "details"])
            || q.contains("explanation:"),
    );
    intent.insert(
        "requires_depth".to_string(),
        contains_any(&q, &["detailed", "comprehensive", "in-depth", "thorough"]),
    );
    intent.insert(
        "requires_basics".to_string(),
        contains_any(&q, &["basic", "beginner", "simple", "introduction", "for dummies"]),
    );
    intent
}
