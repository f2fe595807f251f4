//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let system = RagSystem::new(settings)?;

    let spinner = Output::spinner("Consulting course materials...");
    let result = system.query(question, None).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{}\n", response.answer);
            Output::sources(&response.sources);
        }
        Err(e) => {
            Output::error(&format!("Failed to answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
