//! In-memory vector store implementation.
//!
//! Useful for testing and small course sets.

use super::{
    cosine_similarity, rank, ChunkMatch, ChunkRecord, CourseRecord, SearchFilter, VectorStore,
};
use crate::course::Course;
use crate::error::{PensumError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory vector store.
pub struct MemoryVectorStore {
    courses: RwLock<HashMap<String, CourseRecord>>,
    chunks: RwLock<HashMap<(String, usize), ChunkRecord>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            courses: RwLock::new(HashMap::new()),
            chunks: RwLock::new(HashMap::new()),
        }
    }

    fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
        lock.read()
            .map_err(|e| PensumError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
        lock.write()
            .map_err(|e| PensumError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_course(&self, record: &CourseRecord) -> Result<()> {
        let mut courses = Self::write(&self.courses)?;
        courses.insert(record.course.title.clone(), record.clone());
        Ok(())
    }

    async fn upsert_chunks(&self, chunks: &[ChunkRecord]) -> Result<usize> {
        let mut store = Self::write(&self.chunks)?;
        for record in chunks {
            store.insert(record.chunk.key(), record.clone());
        }
        Ok(chunks.len())
    }

    async fn delete_course_chunks(&self, course_title: &str) -> Result<usize> {
        let mut store = Self::write(&self.chunks)?;
        let before = store.len();
        store.retain(|(title, _), _| title != course_title);
        Ok(before - store.len())
    }

    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<ChunkMatch>> {
        let chunks = Self::read(&self.chunks)?;

        let matches: Vec<ChunkMatch> = chunks
            .values()
            .filter(|r| filter.matches(&r.chunk))
            .map(|r| ChunkMatch {
                chunk: r.chunk.clone(),
                score: cosine_similarity(query_embedding, &r.embedding),
            })
            .collect();

        Ok(rank(matches, limit))
    }

    async fn nearest_course(&self, query_embedding: &[f32]) -> Result<Option<String>> {
        let courses = Self::read(&self.courses)?;

        let best = courses
            .values()
            .map(|r| (cosine_similarity(query_embedding, &r.embedding), &r.course.title))
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, title)| title.clone());

        Ok(best)
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let courses = Self::read(&self.courses)?;
        Ok(courses.get(title).map(|r| r.course.clone()))
    }

    async fn list_course_titles(&self) -> Result<Vec<String>> {
        let courses = Self::read(&self.courses)?;
        let mut titles: Vec<String> = courses.keys().cloned().collect();
        titles.sort();
        Ok(titles)
    }

    async fn course_count(&self) -> Result<usize> {
        Ok(Self::read(&self.courses)?.len())
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(Self::read(&self.chunks)?.len())
    }

    async fn clear(&self) -> Result<()> {
        Self::write(&self.courses)?.clear();
        Self::write(&self.chunks)?.clear();
        Ok(())
    }
}
