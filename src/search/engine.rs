//! Search engine backed by a vector store and an embedder.

use super::{ChunkMetadata, CourseOutline, CourseSearch, SearchResults};
use crate::course::{Course, CourseChunk};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{ChunkRecord, CourseRecord, SearchFilter, VectorStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Resolves course names, embeds queries and ranks course content.
pub struct SearchEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    max_results: usize,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>, max_results: usize) -> Self {
        Self {
            store,
            embedder,
            max_results,
        }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Map a partial or approximate course name to a catalog title.
    ///
    /// Returns `None` only when the catalog is empty.
    #[instrument(skip(self))]
    pub async fn resolve_course_name(&self, course_name: &str) -> Result<Option<String>> {
        let embedding = self.embedder.embed(course_name).await?;
        let title = self.store.nearest_course(&embedding).await?;
        debug!("Resolved '{}' to {:?}", course_name, title);
        Ok(title)
    }

    /// Embed and store a course's catalog record and content chunks.
    ///
    /// Chunks left over from an earlier indexing of the same title are
    /// removed, so the stored content always matches `chunks`.
    #[instrument(skip(self, course, chunks), fields(title = %course.title, chunks = chunks.len()))]
    pub async fn index_course(&self, course: &Course, chunks: &[CourseChunk]) -> Result<usize> {
        let title_embedding = self.embedder.embed(&course.title).await?;

        let records: Vec<ChunkRecord> = if chunks.is_empty() {
            Vec::new()
        } else {
            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            chunks
                .iter()
                .cloned()
                .zip(embeddings)
                .map(|(chunk, embedding)| ChunkRecord { chunk, embedding })
                .collect()
        };

        self.store
            .upsert_course(&CourseRecord::new(course.clone(), title_embedding))
            .await?;

        let removed = self.store.delete_course_chunks(&course.title).await?;
        if removed > 0 {
            debug!("Replaced {} previously indexed chunks", removed);
        }
        if records.is_empty() {
            return Ok(0);
        }

        let stored = self.store.upsert_chunks(&records).await?;
        info!("Indexed course '{}' with {} chunks", course.title, stored);
        Ok(stored)
    }

    async fn run_search(
        &self,
        query: &str,
        course_title: Option<String>,
        lesson_number: Option<u32>,
    ) -> Result<SearchResults> {
        let filter = SearchFilter::new(course_title, lesson_number);
        let embedding = self.embedder.embed(query).await?;
        let matches = self
            .store
            .search_chunks(&embedding, &filter, self.max_results)
            .await?;

        let mut courses: HashMap<String, Option<Course>> = HashMap::new();
        let mut results = SearchResults::default();

        for m in matches {
            let link = match m.chunk.lesson_number {
                Some(n) => {
                    if !courses.contains_key(&m.chunk.course_title) {
                        let course = self.store.get_course(&m.chunk.course_title).await?;
                        courses.insert(m.chunk.course_title.clone(), course);
                    }
                    courses
                        .get(&m.chunk.course_title)
                        .and_then(|c| c.as_ref())
                        .and_then(|c| c.lesson_link(n))
                        .map(str::to_string)
                }
                None => None,
            };

            results.push(
                m.chunk.content,
                ChunkMetadata {
                    course_title: m.chunk.course_title,
                    lesson_number: m.chunk.lesson_number,
                    chunk_index: m.chunk.chunk_index,
                },
                m.score,
                link,
            );
        }

        Ok(results)
    }
}

#[async_trait]
impl CourseSearch for SearchEngine {
    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults {
        let course_title = match course_name {
            Some(name) => match self.resolve_course_name(name).await {
                Ok(Some(title)) => Some(title),
                Ok(None) => return SearchResults::empty(format!("No course found matching '{}'", name)),
                Err(e) => {
                    warn!("Course name resolution failed: {}", e);
                    return SearchResults::empty(format!("Search error: {}", e));
                }
            },
            None => None,
        };

        match self.run_search(query, course_title, lesson_number).await {
            Ok(results) => {
                debug!("Search returned {} fragments", results.len());
                results
            }
            Err(e) => {
                warn!("Search failed: {}", e);
                SearchResults::empty(format!("Search error: {}", e))
            }
        }
    }

    #[instrument(skip(self))]
    async fn outline(&self, course_name: &str) -> Result<Option<CourseOutline>> {
        match self.resolve_course_name(course_name).await? {
            Some(title) => self.store.get_course(&title).await,
            None => Ok(None),
        }
    }
}
