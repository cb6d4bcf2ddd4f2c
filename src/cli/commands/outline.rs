//! Outline command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::PensumError;
use crate::rag::RagSystem;
use anyhow::Result;

/// Show a course's metadata and lessons.
pub async fn run_outline(course: &str, settings: Settings) -> Result<()> {
    let rag = RagSystem::new(settings)?;

    let outline = rag
        .outline(course)
        .await?
        .ok_or_else(|| PensumError::CourseNotFound(course.to_string()))?;

    Output::header(&outline.title);
    if let Some(link) = &outline.link {
        Output::kv("Link", link);
    }
    if let Some(instructor) = &outline.instructor {
        Output::kv("Instructor", instructor);
    }
    println!();

    for lesson in &outline.lessons {
        Output::list_item(&format!("Lesson {}: {}", lesson.number, lesson.title));
    }

    Ok(())
}
