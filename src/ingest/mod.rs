//! Course document ingestion.
//!
//! Turns plain-text course documents into a [`Course`] plus the
//! [`CourseChunk`]s that get embedded for search.

mod chunker;

pub use chunker::{split_sentences, SentenceChunker};

use crate::config::ChunkingSettings;
use crate::course::{Course, CourseChunk, Lesson};
use crate::error::{PensumError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// File extensions treated as course documents.
const COURSE_EXTENSIONS: &[&str] = &["txt", "md"];

/// A parsed course and its chunks.
#[derive(Debug, Clone)]
pub struct CourseDocument {
    pub course: Course,
    pub chunks: Vec<CourseChunk>,
}

/// Whether a path looks like a course document.
pub fn is_course_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| COURSE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// Course documents directly inside `dir`, sorted by path.
pub fn course_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PensumError::Ingest(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if is_course_file(&path) {
            files.push(path);
        } else {
            debug!("Skipping {}", path.display());
        }
    }

    files.sort();
    Ok(files)
}

/// Parses course documents and chunks their lessons.
pub struct DocumentProcessor {
    chunker: SentenceChunker,
    title_re: Regex,
    link_re: Regex,
    instructor_re: Regex,
    lesson_re: Regex,
    lesson_link_re: Regex,
}

impl DocumentProcessor {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let header = |name: &str| {
            Regex::new(&format!(r"(?i)^\s*{}:\s*(.*?)\s*$", name)).expect("Invalid regex")
        };

        Self {
            chunker: SentenceChunker::new(chunk_size, chunk_overlap),
            title_re: header("Course Title"),
            link_re: header("Course Link"),
            instructor_re: header("Course Instructor"),
            lesson_re: Regex::new(r"(?i)^\s*Lesson\s+(\d+)\s*:\s*(.*?)\s*$").expect("Invalid regex"),
            lesson_link_re: header("Lesson Link"),
        }
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Self {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    fn capture(re: &Regex, line: &str) -> Option<String> {
        re.captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Read and parse a course file. The file stem is the fallback title.
    #[instrument(skip(self))]
    pub fn process_file(&self, path: &Path) -> Result<CourseDocument> {
        let text = std::fs::read_to_string(path)?;
        let fallback = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        self.parse(&text, fallback)
    }

    /// Parse a course document.
    pub fn parse(&self, text: &str, fallback_title: &str) -> Result<CourseDocument> {
        let mut lines = text.lines().peekable();
        let mut course = Course::new("");

        // Header: leading metadata lines, blank lines allowed in between
        while let Some(line) = lines.peek() {
            if line.trim().is_empty() {
                lines.next();
            } else if let Some(title) = Self::capture(&self.title_re, line) {
                course.title = title;
                lines.next();
            } else if let Some(link) = Self::capture(&self.link_re, line) {
                course.link = Some(link).filter(|l| !l.is_empty());
                lines.next();
            } else if let Some(instructor) = Self::capture(&self.instructor_re, line) {
                course.instructor = Some(instructor).filter(|i| !i.is_empty());
                lines.next();
            } else {
                break;
            }
        }

        if course.title.is_empty() {
            course.title = fallback_title.trim().to_string();
        }
        if course.title.is_empty() {
            return Err(PensumError::Ingest("Course document has no title".to_string()));
        }

        let mut preamble = Vec::new();
        let mut sections: Vec<(Lesson, Vec<&str>)> = Vec::new();

        while let Some(line) = lines.next() {
            if let Some(caps) = self.lesson_re.captures(line) {
                let number: u32 = caps[1].parse().map_err(|_| {
                    PensumError::Ingest(format!("Invalid lesson number in '{}'", line.trim()))
                })?;
                let mut lesson = Lesson::new(number, caps[2].to_string(), None);

                if let Some(next) = lines.peek() {
                    if let Some(link) = Self::capture(&self.lesson_link_re, next) {
                        lesson.link = Some(link).filter(|l| !l.is_empty());
                        lines.next();
                    }
                }

                sections.push((lesson, Vec::new()));
            } else if let Some((_, body)) = sections.last_mut() {
                body.push(line);
            } else {
                preamble.push(line);
            }
        }

        let mut chunks = Vec::new();

        if sections.is_empty() {
            for content in self.chunker.chunk(&preamble.join("\n")) {
                chunks.push(CourseChunk {
                    content,
                    course_title: course.title.clone(),
                    lesson_number: None,
                    chunk_index: chunks.len(),
                });
            }
        } else if preamble.iter().any(|l| !l.trim().is_empty()) {
            warn!("Ignoring text before the first lesson of '{}'", course.title);
        }

        for (lesson, body) in &sections {
            for (i, text) in self.chunker.chunk(&body.join("\n")).into_iter().enumerate() {
                let content = if i == 0 {
                    format!("Lesson {} content: {}", lesson.number, text)
                } else {
                    text
                };
                chunks.push(CourseChunk {
                    content,
                    course_title: course.title.clone(),
                    lesson_number: Some(lesson.number),
                    chunk_index: chunks.len(),
                });
            }
        }

        course.lessons = sections.into_iter().map(|(lesson, _)| lesson).collect();
        debug!(
            "Parsed '{}': {} lessons, {} chunks",
            course.title,
            course.lessons.len(),
            chunks.len()
        );

        Ok(CourseDocument { course, chunks })
    }
}
