//! Deterministic provider used for tests and offline fallbacks.

use crate::config::DEFAULT_STUB_ANSWER;

#[derive(Debug, Clone, Copy, Default)]
pub struct StubProvider;

impl StubProvider {
    pub fn name(&self) -> &'static str {
        "stub"
    }

    /// Ignore the prompt and return the default stub answer.
    pub fn generate(&self, _prompt: &str) -> String {
        DEFAULT_STUB_ANSWER.to_string()
    }
}
