//! Configuration module for course-rag.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{GeneratorPrompts, Prompts};
pub use settings::{
    EmbeddingProvider, EmbeddingSettings, GeneralSettings, IngestSettings, LlmSettings,
    PromptSettings, SearchSettings, SessionSettings, Settings, VectorStoreSettings,
};
