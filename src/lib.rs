//! DeskMate - local-first service desk copilot
//!
//! This library provides the core of a retrieval-augmented QA service for
//! service-desk knowledge bases:
//! - Ingest pasted text, extracted PDF text, and crawled pages into a
//!   dense vector index plus an entity/document graph
//! - Plan between GRAPH / VECTOR / HYBRID retrieval using graph degrees
//! - Compose grounded prompts and answer through pluggable model
//!   providers (Ollama, Groq, llama.cpp, deterministic stub)
//! - Degrade gracefully: in-memory stores and stub providers keep the
//!   full contract when external dependencies are down

pub mod chunking;
pub mod config;
pub mod embed;
pub mod entities;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod providers;
pub mod rag;
pub mod state;
pub mod store;

// Re-export common types
pub use config::{Settings, DEFAULT_STUB_ANSWER};
pub use error::{Error, Result};
pub use ingest::IngestService;
pub use models::{AskResponse, HealthReport, IngestResult, PlannerDecision, RetrievalMode};
pub use rag::ask;
pub use state::AppState;
