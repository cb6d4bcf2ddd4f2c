//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::course::source_label;
use crate::rag::RagSystem;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    course: Option<&str>,
    lesson: Option<u32>,
    settings: Settings,
) -> Result<()> {
    preflight::check(Operation::Search, &settings)?;

    let rag = RagSystem::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let results = rag.search(query, course, lesson).await;
    spinner.finish_and_clear();

    if let Some(error) = &results.error {
        Output::error(error);
        return Err(anyhow::anyhow!("{}", error));
    }

    if results.is_empty() {
        Output::warning("No results found matching your query.");
        return Ok(());
    }

    Output::success(&format!("Found {} results", results.len()));
    for (i, document) in results.documents.iter().enumerate() {
        let meta = &results.metadata[i];
        Output::search_result(
            &source_label(&meta.course_title, meta.lesson_number),
            results.scores[i],
            document,
            results.lesson_links[i].as_deref(),
        );
    }

    Ok(())
}
