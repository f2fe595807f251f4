//! Outline command implementation.

use crate::agent::CourseOutlineTool;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::VectorStore;
use anyhow::Result;
use std::sync::Arc;

/// Run the outline command.
pub async fn run_outline(course: &str, settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let store = Arc::new(VectorStore::from_settings(settings)?);
    let output = CourseOutlineTool::new(store).outline(course).await?;

    println!("\n{}\n", output.text);
    Ok(())
}
