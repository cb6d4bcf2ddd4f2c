//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Course catalogs are small, so a full scan per query is acceptable.

use super::{
    cosine_similarity, rank, ChunkMatch, ChunkRecord, CourseRecord, SearchFilter, VectorStore,
};
use crate::course::{Course, CourseChunk, Lesson};
use crate::error::{PensumError, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS courses (
    title TEXT PRIMARY KEY,
    link TEXT,
    instructor TEXT,
    lessons_json TEXT NOT NULL,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    course_title TEXT NOT NULL,
    lesson_number INTEGER,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    PRIMARY KEY (course_title, chunk_index)
);

CREATE INDEX IF NOT EXISTS idx_chunks_course_title ON chunks(course_title);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init_schema(&conn)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create the tables. A chunks table from an older layout keyed by a
    /// derived `id` column is dropped; its courses must be re-ingested.
    fn init_schema(conn: &Connection) -> Result<()> {
        let legacy: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM pragma_table_info('chunks') WHERE name = 'id'",
            [],
            |row| row.get(0),
        )?;
        if legacy {
            warn!("Dropping chunks table with outdated layout, re-ingest to restore content");
            conn.execute_batch("DROP TABLE chunks;")?;
        }
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PensumError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, record), fields(title = %record.course.title))]
    async fn upsert_course(&self, record: &CourseRecord) -> Result<()> {
        let conn = self.lock()?;
        let lessons_json = serde_json::to_string(&record.course.lessons)?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO courses
            (title, link, instructor, lessons_json, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.course.title,
                record.course.link,
                record.course.instructor,
                lessons_json,
                Self::embedding_to_bytes(&record.embedding),
                record.indexed_at.to_rfc3339(),
            ],
        )?;

        debug!("Upserted course {}", record.course.title);
        Ok(())
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn upsert_chunks(&self, chunks: &[ChunkRecord]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for record in chunks {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (course_title, lesson_number, chunk_index, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    record.chunk.course_title,
                    record.chunk.lesson_number,
                    record.chunk.chunk_index as i64,
                    record.chunk.content,
                    Self::embedding_to_bytes(&record.embedding),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self))]
    async fn delete_course_chunks(&self, course_title: &str) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM chunks WHERE course_title = ?1",
            params![course_title],
        )?;
        debug!("Removed {} chunks", removed);
        Ok(removed)
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<ChunkMatch>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT course_title, lesson_number, chunk_index, content, embedding
            FROM chunks
            WHERE (?1 IS NULL OR course_title = ?1)
              AND (?2 IS NULL OR lesson_number = ?2)
            "#,
        )?;

        let rows = stmt.query_map(params![filter.course_title, filter.lesson_number], |row| {
            let chunk_index: i64 = row.get(2)?;
            let embedding_bytes: Vec<u8> = row.get(4)?;
            Ok(ChunkMatch {
                score: cosine_similarity(query_embedding, &Self::bytes_to_embedding(&embedding_bytes)),
                chunk: CourseChunk {
                    course_title: row.get(0)?,
                    lesson_number: row.get(1)?,
                    chunk_index: chunk_index as usize,
                    content: row.get(3)?,
                },
            })
        })?;

        let matches: Vec<ChunkMatch> = rows.collect::<std::result::Result<_, _>>()?;
        let results = rank(matches, limit);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self, query_embedding))]
    async fn nearest_course(&self, query_embedding: &[f32]) -> Result<Option<String>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT title, embedding FROM courses")?;
        let rows = stmt.query_map([], |row| {
            let title: String = row.get(0)?;
            let embedding_bytes: Vec<u8> = row.get(1)?;
            Ok((title, Self::bytes_to_embedding(&embedding_bytes)))
        })?;

        let mut best: Option<(f32, String)> = None;
        for row in rows {
            let (title, embedding) = row?;
            let score = cosine_similarity(query_embedding, &embedding);
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, title));
            }
        }

        Ok(best.map(|(_, title)| title))
    }

    #[instrument(skip(self))]
    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT title, link, instructor, lessons_json FROM courses WHERE title = ?1",
                params![title],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((title, link, instructor, lessons_json)) => {
                let lessons: Vec<Lesson> = serde_json::from_str(&lessons_json)?;
                Ok(Some(Course {
                    title,
                    link,
                    instructor,
                    lessons,
                }))
            }
            None => Ok(None),
        }
    }

    async fn list_course_titles(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT title FROM courses ORDER BY title")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(titles)
    }

    async fn course_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM chunks; DELETE FROM courses;")?;
        info!("Cleared course catalog and content");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_course() -> Course {
        Course {
            title: "Test Course".to_string(),
            link: Some("http://example.com/course".to_string()),
            instructor: Some("Test Instructor".to_string()),
            lessons: vec![
                Lesson::new(1, "Introduction", Some("http://example.com/1".to_string())),
                Lesson::new(2, "Basics", None),
            ],
        }
    }

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        store
            .upsert_course(&CourseRecord::new(sample_course(), vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();

        let course = store.get_course("Test Course").await.unwrap().unwrap();
        assert_eq!(course, sample_course());
        assert!(store.get_course("Missing").await.unwrap().is_none());

        let chunks = vec![
            ChunkRecord {
                chunk: CourseChunk {
                    content: "First chunk content".to_string(),
                    course_title: "Test Course".to_string(),
                    lesson_number: Some(1),
                    chunk_index: 0,
                },
                embedding: vec![1.0, 0.0, 0.0],
            },
            ChunkRecord {
                chunk: CourseChunk {
                    content: "Course overview".to_string(),
                    course_title: "Test Course".to_string(),
                    lesson_number: None,
                    chunk_index: 1,
                },
                embedding: vec![0.0, 1.0, 0.0],
            },
        ];
        assert_eq!(store.upsert_chunks(&chunks).await.unwrap(), 2);
        // Re-upserting the same keys replaces rather than duplicates
        store.upsert_chunks(&chunks).await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 2);

        let results = store
            .search_chunks(&[1.0, 0.0, 0.0], &SearchFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].chunk.content, "First chunk content");
        assert_eq!(results[1].chunk.lesson_number, None);

        let lesson_one = store
            .search_chunks(&[0.0, 1.0, 0.0], &SearchFilter::new(None, Some(1)), 10)
            .await
            .unwrap();
        assert_eq!(lesson_one.len(), 1);
        assert_eq!(lesson_one[0].chunk.chunk_index, 0);

        let other_course = store
            .search_chunks(
                &[1.0, 0.0, 0.0],
                &SearchFilter::new(Some("Other".to_string()), None),
                10,
            )
            .await
            .unwrap();
        assert!(other_course.is_empty());

        store.clear().await.unwrap();
        assert_eq!(store.course_count().await.unwrap(), 0);
        assert_eq!(store.chunk_count().await.unwrap(), 0);
    }

    fn chunk(course: &str, index: usize, content: &str) -> ChunkRecord {
        ChunkRecord {
            chunk: CourseChunk {
                content: content.to_string(),
                course_title: course.to_string(),
                lesson_number: Some(1),
                chunk_index: index,
            },
            embedding: vec![1.0, 0.0],
        }
    }

    #[tokio::test]
    async fn test_sqlite_lookalike_titles_keep_separate_chunks() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store
            .upsert_chunks(&[chunk("A B", 0, "spaced"), chunk("A_B", 0, "underscored")])
            .await
            .unwrap();

        assert_eq!(store.chunk_count().await.unwrap(), 2);
        for (title, content) in [("A B", "spaced"), ("A_B", "underscored")] {
            let hits = store
                .search_chunks(
                    &[1.0, 0.0],
                    &SearchFilter::new(Some(title.to_string()), None),
                    10,
                )
                .await
                .unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].chunk.content, content);
        }
    }

    #[tokio::test]
    async fn test_sqlite_delete_course_chunks() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store
            .upsert_chunks(&[
                chunk("Rust Basics", 0, "one"),
                chunk("Rust Basics", 1, "two"),
                chunk("Go Basics", 0, "three"),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete_course_chunks("Rust Basics").await.unwrap(), 2);
        assert_eq!(store.delete_course_chunks("Missing").await.unwrap(), 0);

        let left = store
            .search_chunks(&[1.0, 0.0], &SearchFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].chunk.course_title, "Go Basics");
    }

    #[tokio::test]
    async fn test_sqlite_drops_chunks_table_with_old_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courses.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE chunks (id TEXT PRIMARY KEY, course_title TEXT NOT NULL, \
                 lesson_number INTEGER, chunk_index INTEGER NOT NULL, \
                 content TEXT NOT NULL, embedding BLOB NOT NULL);
                 INSERT INTO chunks VALUES ('A_B_0', 'A_B', 1, 0, 'old', x'00000000');",
            )
            .unwrap();
        }

        let store = SqliteVectorStore::new(&path).unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 0);
        store
            .upsert_chunks(&[chunk("A B", 0, "spaced"), chunk("A_B", 0, "underscored")])
            .await
            .unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sqlite_nearest_course_and_titles() {
        let store = SqliteVectorStore::in_memory().unwrap();
        assert!(store.nearest_course(&[1.0, 0.0]).await.unwrap().is_none());

        store
            .upsert_course(&CourseRecord::new(Course::new("Zeta"), vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .upsert_course(&CourseRecord::new(Course::new("Alpha"), vec![0.0, 1.0]))
            .await
            .unwrap();

        assert_eq!(
            store.nearest_course(&[0.9, 0.1]).await.unwrap(),
            Some("Zeta".to_string())
        );
        assert_eq!(
            store.list_course_titles().await.unwrap(),
            vec!["Alpha".to_string(), "Zeta".to_string()]
        );
        assert_eq!(store.course_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sqlite_store_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("courses.db");

        {
            let store = SqliteVectorStore::new(&path).unwrap();
            store
                .upsert_course(&CourseRecord::new(sample_course(), vec![1.0]))
                .await
                .unwrap();
        }

        let reopened = SqliteVectorStore::new(&path).unwrap();
        assert_eq!(reopened.course_count().await.unwrap(), 1);
    }
}
