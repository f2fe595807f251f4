//! Course outline lookup, exposed to the model as a tool.

use super::tools::{Source, Tool, ToolOutput};
use crate::error::{CourseRagError, Result};
use crate::models::Course;
use crate::vector_store::VectorStore;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct OutlineInput {
    course_name: String,
}

/// Tool returning a course's title, link, instructor and lesson list.
pub struct CourseOutlineTool {
    store: Arc<VectorStore>,
}

impl CourseOutlineTool {
    pub const NAME: &'static str = "get_course_outline";

    pub fn new(store: Arc<VectorStore>) -> Self {
        Self { store }
    }

    /// Resolve `course_name` and render its outline.
    pub async fn outline(&self, course_name: &str) -> Result<ToolOutput> {
        let not_found = || ToolOutput::text(format!("No course found matching '{}'", course_name));

        let Some(title) = self.store.resolve_course_name(course_name).await else {
            return Ok(not_found());
        };
        let Some(course) = self.store.get_course(&title).await? else {
            return Ok(not_found());
        };

        let source = Source {
            text: course.title.clone(),
            url: course.course_link.clone(),
        };
        Ok(ToolOutput::with_sources(format_outline(&course), vec![source]))
    }
}

fn format_outline(course: &Course) -> String {
    let mut lines = vec![format!("Course Title: {}", course.title)];
    if let Some(link) = &course.course_link {
        lines.push(format!("Course Link: {}", link));
    }
    if let Some(instructor) = &course.instructor {
        lines.push(format!("Instructor: {}", instructor));
    }

    let mut lessons: Vec<_> = course.lessons.iter().collect();
    lessons.sort_by_key(|lesson| lesson.lesson_number);

    lines.push(String::new());
    lines.push(format!("Lessons ({} total):", lessons.len()));
    for lesson in lessons {
        match &lesson.lesson_link {
            Some(link) => lines.push(format!(
                "Lesson {}: {} ({})",
                lesson.lesson_number, lesson.title, link
            )),
            None => lines.push(format!("Lesson {}: {}", lesson.lesson_number, lesson.title)),
        }
    }

    lines.join("\n")
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Get the complete outline of a course: title, link, instructor and every lesson"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "course_name": {
                    "type": "string",
                    "description": "Course title or a partial name (e.g. 'MCP', 'Introduction')"
                }
            },
            "required": ["course_name"]
        })
    }

    async fn execute(&self, input: &Value) -> Result<ToolOutput> {
        let input: OutlineInput = serde_json::from_value(input.clone()).map_err(|e| {
            CourseRagError::Tool(format!("Invalid input for {}: {}", Self::NAME, e))
        })?;
        self.outline(&input.course_name).await
    }
}
