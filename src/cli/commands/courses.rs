//! Courses command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use anyhow::Result;

/// List indexed courses.
pub async fn run_courses(settings: Settings) -> Result<()> {
    let rag = RagSystem::new(settings)?;
    let analytics = rag.course_analytics().await?;

    if analytics.total_courses == 0 {
        Output::info("No courses indexed yet. Use 'pensum ingest <dir>' to add documents.");
        return Ok(());
    }

    Output::header(&format!("Indexed Courses ({})", analytics.total_courses));
    println!();
    for title in &analytics.course_titles {
        Output::list_item(title);
    }

    let chunks = rag.store().chunk_count().await?;
    println!();
    Output::kv("Total chunks", &chunks.to_string());

    Ok(())
}
