//! Semantic search over course content, exposed to the model as a tool.

use super::tools::{Source, Tool, ToolOutput};
use crate::error::{CourseRagError, Result};
use crate::vector_store::{Metadata, VectorStore};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct SearchInput {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default)]
    lesson_number: Option<i64>,
}

/// Tool searching course content with optional course and lesson scoping.
pub struct CourseSearchTool {
    store: Arc<VectorStore>,
}

impl CourseSearchTool {
    pub const NAME: &'static str = "search_course_content";

    pub fn new(store: Arc<VectorStore>) -> Self {
        Self { store }
    }

    /// Search and format results for the model.
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<i64>,
    ) -> ToolOutput {
        let results = self
            .store
            .search(query, course_name, lesson_number, None)
            .await;

        if let Some(error) = results.error {
            return ToolOutput::text(error);
        }

        if results.is_empty() {
            let mut filter_info = String::new();
            if let Some(course) = course_name {
                filter_info.push_str(&format!(" in course '{}'", course));
            }
            if let Some(lesson) = lesson_number {
                filter_info.push_str(&format!(" in lesson {}", lesson));
            }
            return ToolOutput::text(format!("No relevant content found{}.", filter_info));
        }

        let mut blocks = Vec::with_capacity(results.len());
        let mut sources = Vec::with_capacity(results.len());

        for (document, metadata, _) in results.iter() {
            let (course_title, lesson) = chunk_location(metadata);
            let label = match lesson {
                Some(n) => format!("{}, Lesson {}", course_title, n),
                None => course_title.to_string(),
            };

            blocks.push(format!("[{}]\n{}", label, document));
            sources.push(Source {
                url: self.source_link(course_title, lesson).await,
                text: label,
            });
        }

        ToolOutput::with_sources(blocks.join("\n\n"), sources)
    }

    /// Lesson link when the chunk has a lesson with one, else the course link.
    async fn source_link(&self, course_title: &str, lesson: Option<i64>) -> Option<String> {
        if let Some(n) = lesson {
            if let Some(link) = self.store.get_lesson_link(course_title, n).await {
                return Some(link);
            }
        }
        self.store.get_course_link(course_title).await
    }
}

fn chunk_location(metadata: &Metadata) -> (&str, Option<i64>) {
    let course_title = metadata
        .get("course_title")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let lesson = metadata.get("lesson_number").and_then(Value::as_i64);
    (course_title, lesson)
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Search course materials with smart course name matching and lesson filtering"
    }

    fn input_schema(&self) -> Value {
        json!({
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
        })
    }

    async fn execute(&self, input: &Value) -> Result<ToolOutput> {
        let input: SearchInput = serde_json::from_value(input.clone()).map_err(|e| {
            CourseRagError::Tool(format!("Invalid input for {}: {}", Self::NAME, e))
        })?;

        Ok(self
            .search(&input.query, input.course_name.as_deref(), input.lesson_number)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ToolManager;
    use crate::test_support::{empty_store, populated_store, ML_TITLE};

    async fn tool() -> CourseSearchTool {
        CourseSearchTool::new(Arc::new(populated_store().await))
    }

    #[tokio::test]
    async fn test_definition() {
        let definition = tool().await.definition();

        assert_eq!(definition.name, "search_course_content");
        assert_eq!(definition.input_schema["required"], json!(["query"]));
        let properties = &definition.input_schema["properties"];
        for key in ["query", "course_name", "lesson_number"] {
            assert!(properties.get(key).is_some(), "missing {}", key);
        }
    }

    #[tokio::test]
    async fn test_basic_search_formats_headers() {
        let output = tool()
            .await
            .execute(&json!({"query": "machine learning"}))
            .await
            .unwrap();

        assert!(output.text.starts_with("[Introduction to Machine Learning, Lesson 1]\n"));
        assert!(output.text.contains("artificial intelligence"));
        assert_eq!(output.text.split("\n\n").count(), 3);

        assert_eq!(output.sources.len(), 3);
        assert_eq!(output.sources[0].text, "Introduction to Machine Learning, Lesson 1");
        assert_eq!(
            output.sources[0].url.as_deref(),
            Some("https://example.com/ml-course/lesson-1")
        );
    }

    #[tokio::test]
    async fn test_lesson_without_link_falls_back_to_course_link() {
        let output = tool().await.search("patterns", None, Some(3)).await;

        assert_eq!(output.sources.len(), 1);
        assert_eq!(
            output.sources[0].url.as_deref(),
            Some("https://example.com/ml-course")
        );
    }

    #[tokio::test]
    async fn test_course_and_lesson_filters() {
        let output = tool()
            .await
            .search("supervised learning", Some("Machine Learning"), Some(2))
            .await;

        assert!(output.text.contains(ML_TITLE));
        assert!(output.text.contains("Lesson 2"));
        assert!(output.text.to_lowercase().contains("supervised"));
        assert_eq!(output.sources.len(), 1);

        let output = tool().await.search("learning", Some("Introduction"), None).await;
        assert!(output.text.contains(ML_TITLE));
    }

    #[tokio::test]
    async fn test_unknown_course() {
        let output = tool()
            .await
            .search("machine learning", Some("Nonexistent Course"), None)
            .await;

        assert_eq!(output.text, "No course found matching 'Nonexistent Course'");
        assert!(output.sources.is_empty());
    }

    #[tokio::test]
    async fn test_no_results_reports_filters() {
        let output = tool()
            .await
            .search("learning", Some("Machine Learning"), Some(99))
            .await;
        assert_eq!(
            output.text,
            "No relevant content found in course 'Machine Learning' in lesson 99."
        );

        let store = CourseSearchTool::new(Arc::new(empty_store()));
        assert_eq!(
            store.search("anything", None, None).await.text,
            "No relevant content found."
        );
    }

    #[tokio::test]
    async fn test_last_sources_reflect_latest_call_only() {
        let mut manager = ToolManager::new();
        manager.register_tool(Box::new(tool().await)).unwrap();

        manager
            .execute_tool(CourseSearchTool::NAME, &json!({"query": "machine learning"}))
            .await
            .unwrap();
        assert_eq!(manager.get_last_sources().len(), 3);

        manager
            .execute_tool(
                CourseSearchTool::NAME,
                &json!({"query": "supervised", "lesson_number": 2}),
            )
            .await
            .unwrap();
        assert_eq!(
            manager.get_last_sources(),
            vec![Source {
                text: "Introduction to Machine Learning, Lesson 2".to_string(),
                url: Some("https://example.com/ml-course/lesson-2".to_string()),
            }]
        );

        manager
            .execute_tool(
                CourseSearchTool::NAME,
                &json!({"query": "learning", "course_name": "Quantum Computing"}),
            )
            .await
            .unwrap();
        assert!(manager.get_last_sources().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let err = tool()
            .await
            .execute(&json!({"course_name": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, CourseRagError::Tool(_)));
    }
}
