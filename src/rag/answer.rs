//! Response composition.
//!
//! Assembles the grounded prompt, calls the active provider, and shapes
//! the final answer with citations and a confidence score.

use std::time::Instant;

use tracing::warn;

use crate::config::DEFAULT_STUB_ANSWER;
use crate::models::{AskResponse, Citation, PlannerDecision, RetrievedChunk};
use crate::providers::ProviderContext;

const FALLBACK_PREFIX: &str = "Model provider unavailable; falling back to stub. ";
const SNIPPET_CHARS: usize = 240;

/// Build the prompt sent to the language model: a service-desk persona,
/// an enumerated context block, and the question.
pub fn compose_prompt(question: &str, chunks: &[RetrievedChunk]) -> String {
    let header = "You are DeskMate, a helpful service desk copilot.\n\
        Use ONLY the provided context to answer.\n\
        Cite supporting evidence with [doc_id:chunk_id] tags that already exist in the context.";

    let context_block = if chunks.is_empty() {
        "(no context available)".to_string()
    } else {
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let label = chunk
                    .metadata
                    .title
                    .as_deref()
                    .filter(|title| !title.is_empty())
                    .unwrap_or(&chunk.metadata.doc_id);
                format!("[{i}] ({label})\n{}", chunk.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "{header}\n\nContext:\n{context_block}\n\nQuestion: {}\nAnswer:",
        question.trim()
    )
}

pub struct Responder<'a> {
    context: &'a ProviderContext,
}

impl<'a> Responder<'a> {
    pub fn new(context: &'a ProviderContext) -> Self {
        Self { context }
    }

    /// Produce the final response. The stub provider short-circuits; any
    /// other provider failure downgrades to the stub-prefixed answer while
    /// keeping the configured provider name in the response.
    pub async fn answer(
        &self,
        question: &str,
        decision: PlannerDecision,
        chunks: Vec<RetrievedChunk>,
    ) -> AskResponse {
        let started = Instant::now();
        let provider_name = self.context.provider.name();

        let answer = if provider_name == "stub" {
            DEFAULT_STUB_ANSWER.to_string()
        } else {
            let prompt = compose_prompt(question, &chunks);
            match self.context.provider.generate(&prompt).await {
                Ok(text) => text,
                Err(err) => {
                    warn!(provider = provider_name, %err, "provider failed; using stub fallback");
                    format!("{FALLBACK_PREFIX}{DEFAULT_STUB_ANSWER}")
                }
            }
        };

        let citations: Vec<Citation> = chunks
            .iter()
            .map(|chunk| Citation {
                doc_id: chunk.metadata.doc_id.clone(),
                chunk_id: chunk.id.clone(),
                score: chunk.score,
                title: chunk.metadata.title.clone(),
                snippet: Some(chunk.text.chars().take(SNIPPET_CHARS).collect()),
            })
            .collect();

        let scores: Vec<f32> = citations.iter().map(|citation| citation.score).collect();
        let confidence = confidence_from_scores(&scores);

        AskResponse {
            answer,
            provider: provider_name.to_string(),
            question: question.to_string(),
            citations,
            planner: decision,
            latency_ms: started.elapsed().as_millis() as u64,
            confidence,
        }
    }
}

/// Monotone-decreasing in mean distance, clamped to [0.1, 0.99];
/// 0.5 when nothing was retrieved.
fn confidence_from_scores(scores: &[f32]) -> f32 {
    if scores.is_empty() {
        return 0.5;
    }
    let mean = scores.iter().sum::<f32>() / scores.len() as f32;
    (1.0 / (1.0 + mean)).clamp(0.1, 0.99)
}
