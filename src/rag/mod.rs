//! Course assistant facade.
//!
//! Wires document ingestion, the vector store, search tools, the agent and
//! conversation sessions behind one type used by the CLI and the HTTP server.

use crate::agent::{
    Agent, CourseOutlineTool, CourseSearchTool, ModelClient, OpenAIModelClient, Source,
    ToolRegistry,
};
use crate::config::{Prompts, Settings};
use crate::course::Course;
use crate::embedding::{create_embedder, Embedder};
use crate::error::{PensumError, Result};
use crate::ingest::{course_files, DocumentProcessor};
use crate::search::{CourseOutline, CourseSearch, SearchEngine, SearchResults};
use crate::session::SessionManager;
use crate::vector_store::{open_store, VectorStore};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Answer to a course question.
#[derive(Debug, Clone)]
pub struct RagResponse {
    pub answer: String,
    /// Sources from the latest call of each tool, in tool registration order.
    pub sources: Vec<Source>,
    /// Session the exchange was recorded under.
    pub session_id: String,
}

impl RagResponse {
    pub fn source_labels(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.label.clone()).collect()
    }

    pub fn source_links(&self) -> Vec<Option<String>> {
        self.sources.iter().map(|s| s.link.clone()).collect()
    }
}

/// Catalog summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// The course materials assistant.
pub struct RagSystem {
    settings: Settings,
    prompts: Prompts,
    processor: DocumentProcessor,
    engine: Arc<SearchEngine>,
    registry: ToolRegistry,
    agent: Agent,
    sessions: SessionManager,
}

impl RagSystem {
    /// Build the assistant from settings: store, embedder and OpenAI model client.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let timeout = Duration::from_secs(settings.assistant.timeout_seconds);
        let store = open_store(&settings.vector_store, &settings.sqlite_path())?;
        let embedder = create_embedder(&settings.embedding, timeout)?;
        let model: Arc<dyn ModelClient> =
            Arc::new(OpenAIModelClient::from_settings(&settings.assistant)?);

        Ok(Self::with_components(settings, prompts, store, embedder, model))
    }

    /// Build the assistant with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn ModelClient>,
    ) -> Self {
        let engine = Arc::new(SearchEngine::new(
            store,
            embedder,
            settings.vector_store.max_results,
        ));

        let search: Arc<dyn CourseSearch> = engine.clone();
        let registry = ToolRegistry::new()
            .with_tool(Arc::new(CourseSearchTool::new(search.clone())))
            .with_tool(Arc::new(CourseOutlineTool::new(search)));

        let agent = Agent::new(model, &prompts.system())
            .with_max_rounds(settings.assistant.max_rounds);

        Self {
            processor: DocumentProcessor::from_settings(&settings.chunking),
            sessions: SessionManager::new(settings.assistant.max_history)
                .with_max_sessions(settings.assistant.max_sessions),
            settings,
            prompts,
            engine,
            registry,
            agent,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        self.engine.store()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Override the tool round budget for this assistant.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.agent = self.agent.with_max_rounds(max_rounds);
        self
    }

    /// Answer a question, continuing the given session or starting a new one.
    #[instrument(skip(self, question))]
    pub async fn query(&self, question: &str, session_id: Option<&str>) -> Result<RagResponse> {
        if question.trim().is_empty() {
            return Err(PensumError::InvalidInput("Query must not be empty".to_string()));
        }

        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.sessions.create_session(),
        };
        let history = self.sessions.history(&session_id);

        self.registry.reset_sources();
        let response = self
            .agent
            .run(&self.prompts.query(question), history.as_deref(), &self.registry)
            .await;

        info!(
            "Answered with {} tool calls and {} model calls",
            response.tool_calls.len(),
            response.model_calls
        );

        self.sessions
            .add_exchange(&session_id, question, &response.content);

        Ok(RagResponse {
            answer: response.content,
            sources: response.sources,
            session_id,
        })
    }

    /// Parse and index one course document.
    #[instrument(skip(self))]
    pub async fn add_course_document(&self, path: &Path) -> Result<(Course, usize)> {
        let doc = self.processor.process_file(path)?;
        let indexed = self.engine.index_course(&doc.course, &doc.chunks).await?;
        Ok((doc.course, indexed))
    }

    /// Index every course document in a folder.
    ///
    /// Courses whose title is already in the catalog are skipped. Files that
    /// fail to parse or index are logged and skipped. Returns the number of
    /// courses and chunks added.
    #[instrument(skip(self))]
    pub async fn add_course_folder(&self, dir: &Path, clear_existing: bool) -> Result<(usize, usize)> {
        if clear_existing {
            info!("Clearing existing course data");
            self.store().clear().await?;
        }

        let files = course_files(dir)?;
        let mut existing: HashSet<String> =
            self.store().list_course_titles().await?.into_iter().collect();

        let mut courses = 0;
        let mut chunks = 0;

        for path in files {
            let doc = match self.processor.process_file(&path) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("Failed to process {}: {}", path.display(), e);
                    continue;
                }
            };

            if existing.contains(&doc.course.title) {
                info!("Course already indexed: {}", doc.course.title);
                continue;
            }

            match self.engine.index_course(&doc.course, &doc.chunks).await {
                Ok(n) => {
                    courses += 1;
                    chunks += n;
                    existing.insert(doc.course.title);
                }
                Err(e) => warn!("Failed to index {}: {}", path.display(), e),
            }
        }

        info!("Added {} courses with {} chunks", courses, chunks);
        Ok((courses, chunks))
    }

    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.store().list_course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    /// Search course content directly, bypassing the model.
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults {
        self.engine.search(query, course_name, lesson_number).await
    }

    pub async fn outline(&self, course_name: &str) -> Result<Option<CourseOutline>> {
        self.engine.outline(course_name).await
    }

    pub fn create_session(&self) -> String {
        self.sessions.create_session()
    }

    /// Forget a session's history. Returns whether it existed.
    pub fn clear_session(&self, session_id: &str) -> bool {
        self.sessions.clear_session(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{
        InferenceRequest, ModelReply, ToolInvocationRequest, TurnContent, SEARCH_TOOL_NAME,
    };
    use crate::embedding::HashingEmbedder;
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const COURSE: &str = "Course Title: Introduction to Retrieval\n\
Course Link: https://example.com/retrieval\n\
Course Instructor: Ada Lovelace\n\
\n\
Lesson 1: Embeddings\n\
Lesson Link: https://example.com/retrieval/1\n\
Embeddings map text to vectors. Similar texts get similar vectors.\n\
Lesson 2: Chunking\n\
Documents are split into chunks. Each chunk is embedded separately.\n";

    struct ScriptedModel {
        replies: Mutex<VecDeque<ModelReply>>,
        requests: Mutex<Vec<InferenceRequest>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<ModelReply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn infer(&self, request: InferenceRequest) -> Result<ModelReply> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| PensumError::Agent("script exhausted".to_string()))
        }
    }

    fn system_with(model: Arc<ScriptedModel>) -> RagSystem {
        RagSystem::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(HashingEmbedder::new(256)),
            model,
        )
    }

    fn docs_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("retrieval.txt"), COURSE).unwrap();
        std::fs::write(
            dir.path().join("notes.txt"),
            "Course Title: Field Notes\nLesson 1: Start\nNotes about the field.",
        )
        .unwrap();
        std::fs::write(dir.path().join("cover.png"), [0u8; 8]).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_add_course_folder_skips_indexed_titles() {
        let system = system_with(ScriptedModel::new(vec![]));
        let dir = docs_dir();

        let (courses, chunks) = system.add_course_folder(dir.path(), false).await.unwrap();
        assert_eq!(courses, 2);
        assert_eq!(chunks, 3);

        assert_eq!(system.add_course_folder(dir.path(), false).await.unwrap(), (0, 0));
        assert_eq!(system.add_course_folder(dir.path(), true).await.unwrap(), (2, 3));

        let analytics = system.course_analytics().await.unwrap();
        assert_eq!(
            analytics,
            CourseAnalytics {
                total_courses: 2,
                course_titles: vec![
                    "Field Notes".to_string(),
                    "Introduction to Retrieval".to_string()
                ],
            }
        );
    }

    #[tokio::test]
    async fn test_query_with_search_tool() {
        let model = ScriptedModel::new(vec![
            ModelReply::ToolUse(vec![ToolInvocationRequest {
                id: "call_1".to_string(),
                name: SEARCH_TOOL_NAME.to_string(),
                arguments: json!({
                    "query": "vectors",
                    "course_name": "Retrieval",
                    "lesson_number": 1
                }),
            }]),
            ModelReply::Text("Embeddings are vectors.".to_string()),
        ]);
        let system = system_with(model.clone());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retrieval.txt");
        std::fs::write(&path, COURSE).unwrap();
        system.add_course_document(&path).await.unwrap();

        let response = system.query("What are embeddings?", None).await.unwrap();

        assert_eq!(response.answer, "Embeddings are vectors.");
        assert_eq!(
            response.source_labels(),
            vec!["Introduction to Retrieval - Lesson 1"]
        );
        assert_eq!(
            response.source_links(),
            vec![Some("https://example.com/retrieval/1".to_string())]
        );

        let requests = model.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 2);
        assert_eq!(
            requests[0].conversation.turns()[0].content,
            TurnContent::Text(
                "Answer this question about course materials: What are embeddings?".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_query_records_history_in_session() {
        let model = ScriptedModel::new(vec![
            ModelReply::Text("First answer.".to_string()),
            ModelReply::Text("Second answer.".to_string()),
        ]);
        let system = system_with(model.clone());

        let first = system.query("First question?", None).await.unwrap();
        assert!(first.sources.is_empty());

        let second = system
            .query("Second question?", Some(&first.session_id))
            .await
            .unwrap();
        assert_eq!(second.session_id, first.session_id);

        let requests = model.requests.lock().unwrap().clone();
        assert!(!requests[0].system.contains("Previous conversation"));
        assert!(requests[1]
            .system
            .ends_with("\n\nPrevious conversation:\nUser: First question?\nAssistant: First answer."));

        assert!(system.clear_session(&first.session_id));
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let system = system_with(ScriptedModel::new(vec![]));
        assert!(matches!(
            system.query("   ", None).await,
            Err(PensumError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_outline_and_direct_search() {
        let system = system_with(ScriptedModel::new(vec![]));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retrieval.txt");
        std::fs::write(&path, COURSE).unwrap();
        let (course, chunks) = system.add_course_document(&path).await.unwrap();
        assert_eq!(course.lessons.len(), 2);
        assert_eq!(chunks, 2);

        let outline = system.outline("retrieval").await.unwrap().unwrap();
        assert_eq!(outline.instructor.as_deref(), Some("Ada Lovelace"));

        let results = system.search("chunks", None, Some(2)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results.metadata[0].lesson_number, Some(2));
    }
}
