//! Retrieval-augmented answering: planner, retriever, and responder.

pub mod answer;
pub mod planner;
pub mod retrieve;

pub use answer::{compose_prompt, Responder};
pub use planner::{Planner, GRAPH_THRESHOLD};
pub use retrieve::{Retrieval, Retriever};

use crate::error::{Error, Result};
use crate::models::AskResponse;
use crate::providers::context_for;
use crate::state::AppState;

/// Answer a question end to end: plan, retrieve with fallbacks, respond.
pub async fn ask(
    state: &AppState,
    question: &str,
    top_k: Option<usize>,
    provider_override: Option<&str>,
) -> Result<AskResponse> {
    let question = question.trim();
    if question.is_empty() {
        return Err(Error::BadInput("question must not be empty".to_string()));
    }
    if top_k == Some(0) {
        return Err(Error::BadInput("top_k must be positive".to_string()));
    }

    let planner = Planner::new(&state.settings, &state.graph);
    let mut decision = planner.plan(question).await;
    if let Some(k) = top_k {
        decision.top_k = k;
    }

    let retriever = Retriever::new(&state.vector, &state.graph, &state.embedder);
    let retrieval = retriever.retrieve(question, &decision).await;
    if let Some(reason) = retrieval.fallback {
        decision.reasons.push(reason);
    }

    let override_context;
    let provider_context = match provider_override {
        Some(name) => {
            override_context = context_for(&state.settings, name.trim().to_lowercase().as_str())?;
            &override_context
        }
        None => &state.provider,
    };

    let responder = Responder::new(provider_context);
    Ok(responder.answer(question, decision, retrieval.chunks).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::state::AppState;

    #[tokio::test]
    async fn empty_question_is_bad_input() {
        let state = AppState::in_memory(Settings::offline());
        let err = ask(&state, "   ", None, None).await.unwrap_err();
        assert!(matches!(err, Error::BadInput(_)));
    }

    #[tokio::test]
    async fn zero_top_k_is_bad_input() {
        let state = AppState::in_memory(Settings::offline());
        let err = ask(&state, "question", Some(0), None).await.unwrap_err();
        assert!(matches!(err, Error::BadInput(_)));
    }

    #[tokio::test]
    async fn unknown_provider_override_is_bad_input() {
        let state = AppState::in_memory(Settings::offline());
        let err = ask(&state, "question", None, Some("openai"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadInput(_)));
    }

    #[tokio::test]
    async fn top_k_override_lands_in_planner_decision() {
        let state = AppState::in_memory(Settings::offline());
        let response = ask(&state, "anything", Some(3), None).await.unwrap();
        assert_eq!(response.planner.top_k, 3);
    }

    #[tokio::test]
    async fn provider_override_is_case_folded() {
        let state = AppState::in_memory(Settings::offline());
        let response = ask(&state, "anything", None, Some(" STUB ")).await.unwrap();
        assert_eq!(response.provider, "stub");
    }
}
