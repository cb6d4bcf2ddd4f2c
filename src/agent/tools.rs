//! Course tools exposed to the assistant.

use super::tool::{Source, Tool, ToolDefinition, ToolOutput};
use crate::course::source_label;
use crate::error::{PensumError, Result};
use crate::search::{CourseOutline, CourseSearch, SearchResults};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

pub const SEARCH_TOOL_NAME: &str = "search_course_content";
pub const OUTLINE_TOOL_NAME: &str = "get_course_outline";

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args[key]
        .as_str()
        .ok_or_else(|| PensumError::InvalidInput(format!("Missing '{}' argument", key)))
}

fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args[key].as_str().filter(|s| !s.trim().is_empty())
}

/// Models sometimes send integers as strings; accept both.
fn optional_u32(args: &Value, key: &str) -> Result<Option<u32>> {
    match &args[key] {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| PensumError::InvalidInput(format!("Invalid '{}' argument: {}", key, n))),
        Value::String(s) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| PensumError::InvalidInput(format!("Invalid '{}' argument: {}", key, s))),
        other => Err(PensumError::InvalidInput(format!(
            "Invalid '{}' argument: {}",
            key, other
        ))),
    }
}

/// Semantic search over course content with optional course and lesson filters.
pub struct CourseSearchTool {
    search: Arc<dyn CourseSearch>,
}

impl CourseSearchTool {
    pub fn new(search: Arc<dyn CourseSearch>) -> Self {
        Self { search }
    }

    fn no_results_message(course_name: Option<&str>, lesson_number: Option<u32>) -> String {
        let mut message = "No relevant content found".to_string();
        if let Some(course) = course_name {
            message.push_str(&format!(" in course '{}'", course));
        }
        if let Some(lesson) = lesson_number {
            message.push_str(&format!(" in lesson {}", lesson));
        }
        message.push('.');
        message
    }

    /// Render results as labeled blocks and collect one source per fragment.
    fn format_results(results: SearchResults) -> ToolOutput {
        let mut blocks = Vec::with_capacity(results.len());
        let mut sources = Vec::with_capacity(results.len());

        for (i, (document, meta)) in results.documents.iter().zip(&results.metadata).enumerate() {
            let label = source_label(&meta.course_title, meta.lesson_number);
            blocks.push(format!("[{}]\n{}", label, document));

            let link = results.lesson_links.get(i).cloned().flatten();
            sources.push(Source::new(label, link));
        }

        ToolOutput::with_sources(blocks.join("\n\n"), sources)
    }
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: SEARCH_TOOL_NAME.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    #[instrument(skip(self, args), fields(tool = SEARCH_TOOL_NAME))]
    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let query = required_str(args, "query")?;
        let course_name = optional_str(args, "course_name");
        let lesson_number = optional_u32(args, "lesson_number")?;

        let results = self.search.search(query, course_name, lesson_number).await;

        if let Some(error) = results.error {
            debug!("Search reported error: {}", error);
            return Ok(ToolOutput::text(error));
        }

        if results.is_empty() {
            return Ok(ToolOutput::text(Self::no_results_message(course_name, lesson_number)));
        }

        Ok(Self::format_results(results))
    }
}

/// Fetches a course's title, link, instructor and complete lesson list.
pub struct CourseOutlineTool {
    search: Arc<dyn CourseSearch>,
}

impl CourseOutlineTool {
    pub fn new(search: Arc<dyn CourseSearch>) -> Self {
        Self { search }
    }

    fn format_outline(outline: &CourseOutline) -> String {
        let mut lines = vec![format!("Course Title: {}", outline.title)];
        if let Some(link) = &outline.link {
            lines.push(format!("Course Link: {}", link));
        }
        if let Some(instructor) = &outline.instructor {
            lines.push(format!("Course Instructor: {}", instructor));
        }

        lines.push(format!("Lessons ({} total):", outline.lessons.len()));
        lines.extend(
            outline
                .lessons
                .iter()
                .map(|l| format!("Lesson {}: {}", l.number, l.title)),
        );

        lines.join("\n")
    }
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: OUTLINE_TOOL_NAME.to_string(),
            description: "Get the complete outline of a course: title, link and the full numbered lesson list"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    }
                },
                "required": ["course_name"]
            }),
        }
    }

    #[instrument(skip(self, args), fields(tool = OUTLINE_TOOL_NAME))]
    async fn execute(&self, args: &Value) -> Result<ToolOutput> {
        let course_name = required_str(args, "course_name")?;

        match self.search.outline(course_name).await? {
            Some(outline) => Ok(ToolOutput::with_sources(
                Self::format_outline(&outline),
                vec![Source::new(outline.title.clone(), outline.link.clone())],
            )),
            None => Ok(ToolOutput::text(format!(
                "No course found matching '{}'",
                course_name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{Course, Lesson};
    use crate::search::ChunkMetadata;
    use std::sync::Mutex;

    /// Returns canned results and records the arguments it was called with.
    #[derive(Default)]
    struct StubSearch {
        results: SearchResults,
        outline: Option<Course>,
        calls: Mutex<Vec<(String, Option<String>, Option<u32>)>>,
    }

    #[async_trait]
    impl CourseSearch for StubSearch {
        async fn search(
            &self,
            query: &str,
            course_name: Option<&str>,
            lesson_number: Option<u32>,
        ) -> SearchResults {
            self.calls.lock().unwrap().push((
                query.to_string(),
                course_name.map(str::to_string),
                lesson_number,
            ));
            self.results.clone()
        }

        async fn outline(&self, _course_name: &str) -> Result<Option<CourseOutline>> {
            Ok(self.outline.clone())
        }
    }

    fn meta(course: &str, lesson: Option<u32>) -> ChunkMetadata {
        ChunkMetadata {
            course_title: course.to_string(),
            lesson_number: lesson,
            chunk_index: 0,
        }
    }

    fn stub_with(results: SearchResults) -> Arc<StubSearch> {
        Arc::new(StubSearch {
            results,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_search_formats_each_fragment() {
        let mut results = SearchResults::default();
        results.push(
            "First result about Python".to_string(),
            meta("Course A", Some(1)),
            0.9,
            Some("http://example.com/a1".to_string()),
        );
        results.push(
            "Second result about programming".to_string(),
            meta("Course B", Some(2)),
            0.8,
            None,
        );
        let stub = stub_with(results);
        let tool = CourseSearchTool::new(stub.clone());

        let output = tool.execute(&json!({"query": "Python programming"})).await.unwrap();

        assert_eq!(
            output.text,
            "[Course A - Lesson 1]\nFirst result about Python\n\n[Course B - Lesson 2]\nSecond result about programming"
        );
        assert_eq!(
            output.sources,
            vec![
                Source::new("Course A - Lesson 1", Some("http://example.com/a1".to_string())),
                Source::new("Course B - Lesson 2", None),
            ]
        );
        assert_eq!(
            stub.calls.lock().unwrap()[0],
            ("Python programming".to_string(), None, None)
        );
    }

    #[tokio::test]
    async fn test_search_without_lesson_number_omits_lesson_segment() {
        let mut results = SearchResults::default();
        results.push("Course overview content".to_string(), meta("Overview Course", None), 0.5, None);
        let tool = CourseSearchTool::new(stub_with(results));

        let output = tool.execute(&json!({"query": "overview"})).await.unwrap();

        assert_eq!(output.text, "[Overview Course]\nCourse overview content");
        assert_eq!(output.sources[0].label, "Overview Course");
    }

    #[tokio::test]
    async fn test_search_passes_filters_through() {
        let stub = stub_with(SearchResults::default());
        let tool = CourseSearchTool::new(stub.clone());

        tool.execute(&json!({"query": "content", "course_name": "Python", "lesson_number": "1"}))
            .await
            .unwrap();

        assert_eq!(
            stub.calls.lock().unwrap()[0],
            ("content".to_string(), Some("Python".to_string()), Some(1))
        );
    }

    #[tokio::test]
    async fn test_search_no_results_messages() {
        let tool = CourseSearchTool::new(stub_with(SearchResults::default()));

        let plain = tool.execute(&json!({"query": "nonexistent topic"})).await.unwrap();
        assert_eq!(plain.text, "No relevant content found.");
        assert!(plain.sources.is_empty());

        let filtered = tool
            .execute(&json!({"query": "topic", "course_name": "X", "lesson_number": 3}))
            .await
            .unwrap();
        assert_eq!(filtered.text, "No relevant content found in course 'X' in lesson 3.");

        let lesson_only = tool
            .execute(&json!({"query": "topic", "lesson_number": 5}))
            .await
            .unwrap();
        assert_eq!(lesson_only.text, "No relevant content found in lesson 5.");
    }

    #[tokio::test]
    async fn test_search_error_is_returned_verbatim() {
        let tool = CourseSearchTool::new(stub_with(SearchResults::empty("boom")));

        let output = tool.execute(&json!({"query": "any query"})).await.unwrap();
        assert_eq!(output.text, "boom");
        assert!(output.sources.is_empty());
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let tool = CourseSearchTool::new(stub_with(SearchResults::default()));
        assert!(tool.execute(&json!({"course_name": "X"})).await.is_err());
        assert!(tool
            .execute(&json!({"query": "q", "lesson_number": -2}))
            .await
            .is_err());
    }

    #[test]
    fn test_search_definition_schema() {
        let tool = CourseSearchTool::new(stub_with(SearchResults::default()));
        let definition = tool.definition();

        assert_eq!(definition.name, "search_course_content");
        let properties = &definition.parameters["properties"];
        assert!(properties.get("query").is_some());
        assert!(properties.get("course_name").is_some());
        assert!(properties.get("lesson_number").is_some());
        assert_eq!(definition.parameters["required"], json!(["query"]));
    }

    #[tokio::test]
    async fn test_outline_lists_all_lessons() {
        let course = Course {
            title: "MCP: Build Rich-Context AI Apps".to_string(),
            link: Some("http://example.com/mcp".to_string()),
            instructor: Some("Elie Schoppik".to_string()),
            lessons: vec![
                Lesson::new(0, "Introduction", None),
                Lesson::new(1, "Why MCP", None),
            ],
        };
        let stub = Arc::new(StubSearch {
            outline: Some(course),
            ..Default::default()
        });
        let tool = CourseOutlineTool::new(stub);

        let output = tool.execute(&json!({"course_name": "MCP"})).await.unwrap();

        assert_eq!(
            output.text,
            "Course Title: MCP: Build Rich-Context AI Apps\n\
             Course Link: http://example.com/mcp\n\
             Course Instructor: Elie Schoppik\n\
             Lessons (2 total):\n\
             Lesson 0: Introduction\n\
             Lesson 1: Why MCP"
        );
        assert_eq!(output.sources[0].label, "MCP: Build Rich-Context AI Apps");
    }

    #[tokio::test]
    async fn test_outline_unknown_course() {
        let tool = CourseOutlineTool::new(Arc::new(StubSearch::default()));

        let output = tool.execute(&json!({"course_name": "Nope"})).await.unwrap();
        assert_eq!(output.text, "No course found matching 'Nope'");
        assert!(output.sources.is_empty());
    }
}
