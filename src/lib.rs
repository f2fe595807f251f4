//! course-rag - Course Materials Assistant
//!
//! Answers questions about indexed course materials. The language model decides
//! whether to search lesson content or fetch a course outline, may do so for a
//! bounded number of sequential rounds, and then answers with the sources it used.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `models` - Courses, lessons and content chunks
//! - `embedding` - Embedding generation (OpenAI or local hashing)
//! - `vector_store` - Catalog and content collections with semantic search
//! - `llm` - Messages API protocol and client
//! - `agent` - Tools, tool registry and the answer generator
//! - `session` - Conversation history
//! - `rag` - The RAG system tying everything together, plus bundle ingestion
//! - `cli` - Command line interface and HTTP server
//!
//! # Example
//!
//! ```rust,no_run
//! use course_rag::config::Settings;
//! use course_rag::rag::RagSystem;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let system = RagSystem::new(&settings)?;
//!
//!     system.add_course_folder(&settings.docs_dir(), false).await?;
//!     let response = system.query("What does lesson 2 cover?", None).await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod models;
pub mod openai;
pub mod rag;
pub mod session;
pub mod vector_store;

#[cfg(test)]
mod test_support;

pub use error::{CourseRagError, Result};
