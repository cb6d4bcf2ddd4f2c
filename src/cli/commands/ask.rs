//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, rounds: Option<usize>, settings: Settings) -> Result<()> {
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

    let spinner = Output::spinner("Searching course materials...");

    match rag.query(question, None).await {
        Ok(response) => {
            spinner.finish_and_clear();
            println!("\n{}\n", response.answer);
            Output::sources(&response.sources);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
