//! Pre-flight checks before operations that call external APIs.
//!
//! Validates that required API keys are available before starting work that
//! would otherwise fail midway.

use crate::config::{EmbeddingProvider, Settings};
use crate::error::{CourseRagError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions needs the model key and query embeddings.
    Ask,
    /// Indexing needs document embeddings.
    Index,
    /// Search and outline lookups need query embeddings.
    Search,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    if let Operation::Ask = operation {
        check_api_key(&settings.llm.api_key_env)?;
    }

    if settings.embedding.provider == EmbeddingProvider::OpenAI {
        check_api_key("OPENAI_API_KEY")?;
    }
    Ok(())
}

/// Check that an API key environment variable is set and non-empty.
fn check_api_key(var: &str) -> Result<()> {
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(CourseRagError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            var, var
        ))),
        Err(_) => Err(CourseRagError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            var, var
        ))),
    }
}
