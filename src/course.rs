//! Course data model shared by ingestion, storage and the tools.

use serde::{Deserialize, Serialize};

/// A single lesson within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson number as written in the document (may start at 0).
    pub number: u32,
    /// Lesson title.
    pub title: String,
    /// Link to the lesson video or page.
    pub link: Option<String>,
}

impl Lesson {
    pub fn new(number: u32, title: impl Into<String>, link: Option<String>) -> Self {
        Self {
            number,
            title: title.into(),
            link,
        }
    }
}

/// A course with its ordered lessons.
///
/// The title doubles as the course's unique identifier in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub link: Option<String>,
    pub instructor: Option<String>,
    pub lessons: Vec<Lesson>,
}

impl Course {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: None,
            instructor: None,
            lessons: Vec::new(),
        }
    }

    /// Look up a lesson by its number.
    pub fn lesson(&self, number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.number == number)
    }

    /// Link for a lesson, if both the lesson and its link exist.
    pub fn lesson_link(&self, number: u32) -> Option<&str> {
        self.lesson(number).and_then(|l| l.link.as_deref())
    }
}

/// A piece of course text ready for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseChunk {
    /// Chunk text.
    pub content: String,
    /// Title of the course this chunk belongs to.
    pub course_title: String,
    /// Lesson the chunk came from, if any.
    pub lesson_number: Option<u32>,
    /// Position of this chunk within the course.
    pub chunk_index: usize,
}

impl CourseChunk {
    /// Storage key: a chunk is unique per course title and position.
    pub fn key(&self) -> (String, usize) {
        (self.course_title.clone(), self.chunk_index)
    }
}

/// Human-readable citation label for a fragment of a course.
///
/// `Course X - Lesson 2`, or just `Course X` when the lesson is unknown.
pub fn source_label(course_title: &str, lesson_number: Option<u32>) -> String {
    match lesson_number {
        Some(n) => format!("{} - Lesson {}", course_title, n),
        None => course_title.to_string(),
    }
}
