//! Course data model.

use serde::{Deserialize, Serialize};

/// A lesson within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson number, unique within its course.
    pub lesson_number: i64,
    /// Lesson title.
    pub title: String,
    /// Link to the lesson, if published.
    #[serde(default)]
    pub lesson_link: Option<String>,
}

/// A course with its ordered lessons.
///
/// The title doubles as the course identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    #[serde(default)]
    pub course_link: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Find a lesson by number.
    pub fn lesson(&self, lesson_number: i64) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.lesson_number == lesson_number)
    }
}

/// A slice of lesson text stored for semantic retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseChunk {
    pub content: String,
    /// Title of the course this chunk belongs to.
    pub course_title: String,
    #[serde(default)]
    pub lesson_number: Option<i64>,
    /// Position of the chunk within its course.
    pub chunk_index: i64,
}

impl CourseChunk {
    /// Identifier used in the content collection.
    pub fn id(&self) -> String {
        format!("{}_{}", self.course_title.replace(' ', "_"), self.chunk_index)
    }
}

/// A pre-chunked course as read from an ingestion file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseBundle {
    pub course: Course,
    #[serde(default)]
    pub chunks: Vec<CourseChunk>,
}
