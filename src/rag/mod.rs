//! Retrieval-augmented question answering over course materials.
//!
//! [`RagSystem`] is the entry point used by the CLI and the HTTP server: it indexes
//! course bundles and answers questions through the tool-using generator.

pub mod ingest;
mod system;

pub use system::{CourseAnalytics, RagResponse, RagSystem};
