//! Course-aware vector store over the catalog and content collections.

use super::{
    CollectionBackend, Filter, MemoryBackend, Metadata, QueryResult, Record, SearchResults,
    SqliteBackend, COURSE_CATALOG, COURSE_CONTENT,
};
use crate::config::Settings;
use crate::embedding::{self, Embedder};
use crate::error::{CourseRagError, Result};
use crate::models::{Course, CourseChunk, Lesson};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Nearest catalog entries at or beyond this distance share no direction with the
/// query and do not count as a match.
///
/// This is not a confidence threshold. Only the hashing embedder produces exactly
/// orthogonal vectors (for names sharing no words with any title); dense model
/// embeddings never reach it, so with the OpenAI provider the nearest title always wins.
const ORTHOGONAL_DISTANCE: f32 = 1.0 - 1e-6;

/// Lesson descriptor as serialized into catalog metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LessonEntry {
    lesson_number: i64,
    lesson_title: String,
    #[serde(default)]
    lesson_link: Option<String>,
}

impl From<&Lesson> for LessonEntry {
    fn from(lesson: &Lesson) -> Self {
        Self {
            lesson_number: lesson.lesson_number,
            lesson_title: lesson.title.clone(),
            lesson_link: lesson.lesson_link.clone(),
        }
    }
}

impl From<LessonEntry> for Lesson {
    fn from(entry: LessonEntry) -> Self {
        Self {
            lesson_number: entry.lesson_number,
            title: entry.lesson_title,
            lesson_link: entry.lesson_link,
        }
    }
}

/// Vector store holding the course catalog and course content chunks.
pub struct VectorStore {
    backend: Arc<dyn CollectionBackend>,
    embedder: Arc<dyn Embedder>,
    max_results: usize,
}

impl VectorStore {
    /// Create a store over an existing backend.
    pub fn new(
        backend: Arc<dyn CollectionBackend>,
        embedder: Arc<dyn Embedder>,
        max_results: usize,
    ) -> Self {
        Self {
            backend,
            embedder,
            max_results,
        }
    }

    /// Create the store selected in settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let backend: Arc<dyn CollectionBackend> = match settings.vector_store.provider.as_str() {
            "sqlite" => Arc::new(SqliteBackend::new(&settings.sqlite_path())?),
            "memory" => Arc::new(MemoryBackend::new()),
            other => {
                return Err(CourseRagError::Config(format!(
                    "Unknown vector store provider: {}",
                    other
                )))
            }
        };

        Ok(Self::new(
            backend,
            embedding::from_settings(&settings.embedding),
            settings.search.max_results,
        ))
    }

    /// Default number of results per search.
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Search course content, optionally scoped to a course and lesson.
    ///
    /// Never fails: resolution and backend faults are reported through
    /// [`SearchResults::error`].
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<i64>,
        limit: Option<usize>,
    ) -> SearchResults {
        let course_title = match course_name {
            Some(name) => match self.resolve_course_name(name).await {
                Some(title) => Some(title),
                None => return SearchResults::empty(format!("No course found matching '{}'", name)),
            },
            None => None,
        };

        let filter = Self::build_filter(course_title.as_deref(), lesson_number);
        let limit = limit.unwrap_or(self.max_results);

        match self.query_content(query, filter.as_ref(), limit).await {
            Ok(results) => {
                debug!("Search returned {} chunks", results.len());
                results
            }
            Err(e) => {
                warn!("Search failed: {}", e);
                SearchResults::empty(format!("Search error: {}", e))
            }
        }
    }

    async fn query_content(
        &self,
        query: &str,
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<SearchResults> {
        let embedding = self.embedder.embed(query).await?;
        let raw = self
            .backend
            .query(COURSE_CONTENT, &embedding, filter, limit)
            .await?;
        Ok(SearchResults::from_query(raw))
    }

    /// Resolve a user-supplied course name to a stored course title.
    ///
    /// Takes the nearest catalog entry by embedding similarity. Returns `None` when the
    /// catalog is empty, the lookup fails, or the nearest entry is orthogonal to the query.
    #[instrument(skip(self))]
    pub async fn resolve_course_name(&self, course_name: &str) -> Option<String> {
        let raw = match self.nearest_course(course_name).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Course name resolution failed: {}", e);
                return None;
            }
        };

        let results = SearchResults::from_query(raw);
        let (_, metadata, distance) = results.iter().next()?;
        if distance >= ORTHOGONAL_DISTANCE {
            debug!("Nearest course is unrelated to '{}'", course_name);
            return None;
        }

        let title = metadata.get("title").and_then(Value::as_str).map(str::to_string);
        debug!("Resolved '{}' to {:?}", course_name, title);
        title
    }

    async fn nearest_course(&self, course_name: &str) -> Result<QueryResult> {
        let embedding = self.embedder.embed(course_name).await?;
        self.backend.query(COURSE_CATALOG, &embedding, None, 1).await
    }

    /// Build the content filter for a resolved course title and lesson number.
    pub fn build_filter(course_title: Option<&str>, lesson_number: Option<i64>) -> Option<Filter> {
        Filter::build(course_title, lesson_number)
    }

    /// Add a course to the catalog, keyed by its title.
    #[instrument(skip(self, course), fields(title = %course.title))]
    pub async fn add_course_metadata(&self, course: &Course) -> Result<()> {
        let lessons: Vec<LessonEntry> = course.lessons.iter().map(LessonEntry::from).collect();

        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), course.title.clone().into());
        if let Some(instructor) = &course.instructor {
            metadata.insert("instructor".to_string(), instructor.clone().into());
        }
        if let Some(link) = &course.course_link {
            metadata.insert("course_link".to_string(), link.clone().into());
        }
        metadata.insert("lessons_json".to_string(), serde_json::to_string(&lessons)?.into());
        metadata.insert("lesson_count".to_string(), lessons.len().into());

        let embedding = self.embedder.embed(&course.title).await?;
        self.backend
            .upsert(
                COURSE_CATALOG,
                &[Record {
                    id: course.title.clone(),
                    document: course.title.clone(),
                    metadata,
                    embedding,
                }],
            )
            .await?;

        info!("Added course '{}' to catalog", course.title);
        Ok(())
    }

    /// Add content chunks to the content collection.
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn add_course_content(&self, chunks: &[CourseChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(CourseRagError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let records: Vec<Record> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                let mut metadata = Metadata::new();
                metadata.insert("course_title".to_string(), chunk.course_title.clone().into());
                if let Some(lesson) = chunk.lesson_number {
                    metadata.insert("lesson_number".to_string(), lesson.into());
                }
                metadata.insert("chunk_index".to_string(), chunk.chunk_index.into());

                Record {
                    id: chunk.id(),
                    document: chunk.content.clone(),
                    metadata,
                    embedding,
                }
            })
            .collect();

        self.backend.upsert(COURSE_CONTENT, &records).await?;
        info!("Added {} content chunks", records.len());
        Ok(())
    }

    /// Titles of every course in the catalog.
    pub async fn get_existing_course_titles(&self) -> Result<Vec<String>> {
        let records = self.backend.get(COURSE_CATALOG, None).await?;
        Ok(records.into_iter().map(|r| r.id).collect())
    }

    /// Number of courses in the catalog.
    pub async fn get_course_count(&self) -> Result<usize> {
        self.backend.count(COURSE_CATALOG).await
    }

    /// Every course in the catalog with its lessons.
    pub async fn get_all_courses_metadata(&self) -> Result<Vec<Course>> {
        let records = self.backend.get(COURSE_CATALOG, None).await?;
        records.iter().map(course_from_metadata).collect()
    }

    /// Look up a course by exact title.
    pub async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let records = self
            .backend
            .get(COURSE_CATALOG, Some(&[title.to_string()]))
            .await?;
        records.first().map(course_from_metadata).transpose()
    }

    /// Link of a course, if the course exists and has one.
    pub async fn get_course_link(&self, course_title: &str) -> Option<String> {
        match self.get_course(course_title).await {
            Ok(course) => course.and_then(|c| c.course_link),
            Err(e) => {
                warn!("Failed to look up course link: {}", e);
                None
            }
        }
    }

    /// Link of a lesson, if the course and lesson exist and the lesson has one.
    pub async fn get_lesson_link(&self, course_title: &str, lesson_number: i64) -> Option<String> {
        match self.get_course(course_title).await {
            Ok(course) => course
                .and_then(|c| c.lesson(lesson_number).cloned())
                .and_then(|l| l.lesson_link),
            Err(e) => {
                warn!("Failed to look up lesson link: {}", e);
                None
            }
        }
    }

    /// Delete and recreate both collections.
    pub async fn clear_all_data(&self) -> Result<()> {
        for collection in [COURSE_CATALOG, COURSE_CONTENT] {
            self.backend.delete_collection(collection).await?;
            self.backend.create_collection(collection).await?;
        }
        info!("Cleared all course data");
        Ok(())
    }
}

fn course_from_metadata(record: &Record) -> Result<Course> {
    let text = |key: &str| {
        record
            .metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let lessons: Vec<LessonEntry> = match text("lessons_json") {
        Some(json) => serde_json::from_str(&json)?,
        None => Vec::new(),
    };

    Ok(Course {
        title: text("title").unwrap_or_else(|| record.id.clone()),
        course_link: text("course_link"),
        instructor: text("instructor"),
        lessons: lessons.into_iter().map(Lesson::from).collect(),
    })
}
