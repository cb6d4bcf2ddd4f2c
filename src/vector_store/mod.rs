//! Vector store abstraction for Pensum.
//!
//! Two logical collections live behind one trait: a course catalog (one
//! record per course, embedded by title for fuzzy name resolution) and the
//! course content chunks used for semantic search.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::config::{VectorStoreProvider, VectorStoreSettings};
use crate::course::{Course, CourseChunk};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A catalog entry: course metadata plus the embedding of its title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    pub course: Course,
    pub embedding: Vec<f32>,
    /// When this course was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl CourseRecord {
    pub fn new(course: Course, embedding: Vec<f32>) -> Self {
        Self {
            course,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A content chunk with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk: CourseChunk,
    pub embedding: Vec<f32>,
}

/// A chunk search hit.
#[derive(Debug, Clone)]
pub struct ChunkMatch {
    pub chunk: CourseChunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Metadata filter applied to chunk search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    /// Exact course title.
    pub course_title: Option<String>,
    /// Exact lesson number.
    pub lesson_number: Option<u32>,
}

impl SearchFilter {
    pub fn new(course_title: Option<String>, lesson_number: Option<u32>) -> Self {
        Self {
            course_title,
            lesson_number,
        }
    }

    /// True when no constraint is set.
    pub fn is_empty(&self) -> bool {
        self.course_title.is_none() && self.lesson_number.is_none()
    }

    /// Whether a chunk satisfies every set constraint.
    pub fn matches(&self, chunk: &CourseChunk) -> bool {
        let course_ok = self
            .course_title
            .as_deref()
            .map_or(true, |title| chunk.course_title == title);
        let lesson_ok = self
            .lesson_number
            .map_or(true, |n| chunk.lesson_number == Some(n));
        course_ok && lesson_ok
    }
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace a catalog record, keyed by course title.
    async fn upsert_course(&self, record: &CourseRecord) -> Result<()>;

    /// Insert or replace content chunks, keyed by course title and chunk index.
    async fn upsert_chunks(&self, chunks: &[ChunkRecord]) -> Result<usize>;

    /// Remove every chunk of a course. Returns how many were removed.
    async fn delete_course_chunks(&self, course_title: &str) -> Result<usize>;

    /// Similarity search over content chunks.
    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<ChunkMatch>>;

    /// Title of the catalog entry closest to the embedding, if any exist.
    async fn nearest_course(&self, query_embedding: &[f32]) -> Result<Option<String>>;

    /// Get a course by its exact title.
    async fn get_course(&self, title: &str) -> Result<Option<Course>>;

    /// Titles of all indexed courses, sorted.
    async fn list_course_titles(&self) -> Result<Vec<String>>;

    /// Number of courses in the catalog.
    async fn course_count(&self) -> Result<usize>;

    /// Number of content chunks.
    async fn chunk_count(&self) -> Result<usize>;

    /// Remove all catalog records and chunks.
    async fn clear(&self) -> Result<()>;
}

/// Open the store selected in the settings.
pub fn open_store(settings: &VectorStoreSettings, sqlite_path: &Path) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match settings.provider {
        VectorStoreProvider::Sqlite => Arc::new(SqliteVectorStore::new(sqlite_path)?),
        VectorStoreProvider::Memory => Arc::new(MemoryVectorStore::new()),
    };
    Ok(store)
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort matches by descending score and keep the top `limit`.
pub(crate) fn rank(mut matches: Vec<ChunkMatch>, limit: usize) -> Vec<ChunkMatch> {
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(limit);
    matches
}
