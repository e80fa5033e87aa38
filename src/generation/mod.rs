//! Answer generation: formats retrieved passages into a context block and
//! asks the configured Ollama model for a grounded answer.


use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::index::{ChunkMetadata, SearchHit};

const GENERATION_TIMEOUT_SECONDS: u64 = 120;

pub struct Generator {
    base_url: Url,
    model: String,
    max_tokens: u32,
    temperature: f32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl Generator {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(GENERATION_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.generator.model.clone(),
            max_tokens: config.generator.max_tokens,
            temperature: config.generator.temperature,
            agent,
        })
    }

    /// Build the grounding prompt: one context block per passage with its
    /// source attribution, then the question.
    #[inline]
    pub fn build_prompt(&self, query: &str, hits: &[SearchHit]) -> String {
        let context_text = hits
            .iter()
            .map(|hit| {
                format!(
                    "Source: {} | Page: {}\n{}",
                    metadata_display(&hit.metadata, "filename", "unknown"),
                    metadata_display(&hit.metadata, "page_number", "N/A"),
                    hit.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "You are a helpful assistant. Use the provided context to answer the question. \
             Context: {context_text}, Question: {query} \
             Answer (be concise, cite sources if relevant):"
        )
    }

    /// Generate an answer for a query from its retrieved passages. A single
    /// blocking call; no retry.
    #[inline]
    pub fn generate(&self, query: &str, hits: &[SearchHit]) -> Result<String> {
        let prompt = self.build_prompt(query, hits);
        debug!(
            "Generating answer with {} ({} context passages)",
            self.model,
            hits.len()
        );

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generation URL")?;
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generation request")?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Generation request failed")?;

        let generate_response: GenerateResponse = serde_json::from_str(&response_text)
            .context("Failed to parse generation response")?;

        Ok(generate_response.response.trim().to_string())
    }
}

/// Render a metadata value for display, without JSON quoting.
fn metadata_display(metadata: &ChunkMetadata, key: &str, default: &str) -> String {
    match metadata.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => default.to_string(),
    }
}
