//! Interactive chat command.
//!
//! Every question goes through the same tool rounds as `ask`; the session
//! keeps the last few exchanges so follow-ups work.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(rounds: Option<usize>, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'pensum doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let mut rag = RagSystem::new(settings)?;
    if let Some(rounds) = rounds {
        rag = rag.with_max_rounds(rounds);
    }
    let mut session_id = rag.create_session();

    println!("\n{}", style("Pensum Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask about your courses, or 'exit' to quit. Use 'clear' to reset the conversation.")
            .dim()
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
            rag.clear_session(&session_id);
            session_id = rag.create_session();
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = rag.query(input, Some(&session_id)).await;
        spinner.finish_and_clear();

        match result {
            Ok(response) => {
                println!("\n{} {}", style("Pensum:").cyan().bold(), response.answer);
                Output::sources(&response.sources);
                println!();
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
