//! Query planner.
//!
//! Routes a question to VECTOR, GRAPH, or HYBRID retrieval based on how
//! well the question's entities are covered by the graph.

use tracing::{debug, warn};

use crate::config::Settings;
use crate::entities::extract_entities;
use crate::models::{PlannerDecision, RetrievalMode};
use crate::store::GraphBackend;

/// Minimum max-degree at which the planner trusts the graph on its own.
/// Derived from the empirical sparsity of small service-desk graphs.
pub const GRAPH_THRESHOLD: usize = 3;

pub struct Planner<'a> {
    settings: &'a Settings,
    graph: &'a GraphBackend,
}

impl<'a> Planner<'a> {
    pub fn new(settings: &'a Settings, graph: &'a GraphBackend) -> Self {
        Self { settings, graph }
    }

    pub async fn plan(&self, question: &str) -> PlannerDecision {
        let top_k = self.settings.top_k;
        let question_entities = extract_entities(&[question]);

        if question_entities.is_empty() {
            return vector_decision(top_k);
        }

        let degrees = match self.graph.degrees(&question_entities).await {
            Ok(degrees) => degrees,
            Err(err) => {
                warn!(%err, "degree lookup failed; planning VECTOR");
                return vector_decision(top_k);
            }
        };

        let max_degree = degrees.values().copied().max().unwrap_or(0);
        if max_degree == 0 {
            return vector_decision(top_k);
        }

        let entities: Vec<String> = question_entities
            .into_iter()
            .filter(|entity| degrees.get(entity).copied().unwrap_or(0) > 0)
            .collect();

        let (mode, reason) = if max_degree >= GRAPH_THRESHOLD {
            (RetrievalMode::Graph, format!("graph coverage >= {GRAPH_THRESHOLD}"))
        } else {
            (RetrievalMode::Hybrid, "graph is sparse".to_string())
        };
        debug!(%mode, max_degree, entities = entities.len(), "planned retrieval");

        PlannerDecision {
            mode,
            reasons: vec![reason],
            top_k,
            entities,
        }
    }
}

fn vector_decision(top_k: usize) -> PlannerDecision {
    PlannerDecision {
        mode: RetrievalMode::Vector,
        reasons: vec!["no graph entities".to_string()],
        top_k,
        entities: Vec::new(),
    }
}
