//! Search command implementation.

use crate::agent::CourseSearchTool;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::VectorStore;
use anyhow::Result;
use std::sync::Arc;

/// Run the search command.
pub async fn run_search(
    query: &str,
    course: Option<&str>,
    lesson: Option<i64>,
    settings: &Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let store = Arc::new(VectorStore::from_settings(settings)?);
    let tool = CourseSearchTool::new(store);

    let spinner = Output::spinner("Searching...");
    let output = tool.search(query, course, lesson).await;
    spinner.finish_and_clear();

    if output.sources.is_empty() {
        Output::warning(&output.text);
        return Ok(());
    }

    Output::success(&format!("Found {} results", output.sources.len()));
    println!("\n{}", output.text);
    Output::sources(&output.sources);

    Ok(())
}
