//! Index command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::ingest;
use crate::vector_store::VectorStore;
use anyhow::Result;
use std::path::PathBuf;

/// Run the index command.
pub async fn run_index(dir: Option<&str>, clear: bool, settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let dir = match dir {
        Some(dir) => PathBuf::from(shellexpand::tilde(dir).to_string()),
        None => settings.docs_dir(),
    };

    if !dir.is_dir() {
        Output::warning(&format!("Folder {} does not exist", dir.display()));
        return Ok(());
    }

    let store = VectorStore::from_settings(settings)?;

    let spinner = Output::spinner(&format!("Indexing courses from {}...", dir.display()));
    let result = ingest::add_course_folder(&store, &dir, clear).await;
    spinner.finish_and_clear();

    let (courses, chunks) = result?;
    if courses == 0 {
        Output::info("No new courses to index.");
    } else {
        Output::success(&format!("Indexed {} courses ({} chunks)", courses, chunks));
    }
    Output::kv("Total courses", &store.get_course_count().await?.to_string());

    Ok(())
}
