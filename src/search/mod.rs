//! Course content search consumed by the assistant's tools.

mod engine;

pub use engine::SearchEngine;

use crate::course::Course;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Course structure returned by outline lookups.
pub type CourseOutline = Course;

/// Metadata attached to each returned fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
}

/// Ranked fragments from one search.
///
/// `documents`, `metadata`, `scores` and `lesson_links` are parallel.
/// When `error` is set the fragment lists are empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub documents: Vec<String>,
    pub metadata: Vec<ChunkMetadata>,
    pub scores: Vec<f32>,
    pub lesson_links: Vec<Option<String>>,
    pub error: Option<String>,
}

impl SearchResults {
    /// Empty results carrying an error message.
    pub fn empty(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Append one fragment.
    pub fn push(
        &mut self,
        document: String,
        metadata: ChunkMetadata,
        score: f32,
        lesson_link: Option<String>,
    ) {
        self.documents.push(document);
        self.metadata.push(metadata);
        self.scores.push(score);
        self.lesson_links.push(lesson_link);
    }
}

/// Search capability over indexed course material.
#[async_trait]
pub trait CourseSearch: Send + Sync {
    /// Semantic search with optional fuzzy course name and exact lesson filters.
    ///
    /// Never fails: problems are reported through [`SearchResults::error`].
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults;

    /// Resolve a fuzzy course name and return its outline.
    async fn outline(&self, course_name: &str) -> Result<Option<CourseOutline>>;
}
