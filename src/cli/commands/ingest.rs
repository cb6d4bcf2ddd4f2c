//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use anyhow::Result;

/// Index the course documents in a folder.
pub async fn run_ingest(dir: Option<&str>, clear: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'pensum doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let dir = match dir {
        Some(d) => Settings::expand_path(d),
        None => settings.docs_dir(),
    };

    let rag = RagSystem::new(settings)?;

    Output::info(&format!("Indexing course documents in {}", dir.display()));
    let spinner = Output::spinner("Parsing and embedding...");
    let result = rag.add_course_folder(&dir, clear).await;
    spinner.finish_and_clear();

    let (courses, chunks) = result?;
    if courses == 0 {
        Output::info("No new courses found.");
    } else {
        Output::success(&format!("Added {} courses with {} chunks", courses, chunks));
    }

    let analytics = rag.course_analytics().await?;
    Output::kv("Courses indexed", &analytics.total_courses.to_string());

    Ok(())
}
