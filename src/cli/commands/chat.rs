//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command. All questions share one session.
pub async fn run_chat(settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let system = RagSystem::new(settings)?;
    let mut session_id = system.sessions().create_session()?;

    println!("\n{}", style("Course Materials Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            system.sessions().clear_session(&session_id)?;
            Output::info("Conversation history cleared.");
            continue;
        }

        match system.query(input, Some(&session_id)).await {
            Ok(response) => {
                println!("\n{} {}", style("Assistant:").cyan().bold(), response.answer);
                Output::sources(&response.sources);
                println!();
                session_id = response.session_id;
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
