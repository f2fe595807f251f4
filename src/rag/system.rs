//! The RAG system: wires the store, tools, generator and sessions together.

use super::ingest;
use crate::agent::{AIGenerator, CourseOutlineTool, CourseSearchTool, Source, ToolManager};
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::models::{Course, CourseChunk};
use crate::session::SessionManager;
use crate::vector_store::VectorStore;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

/// Answer to a user query.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub answer: String,
    /// Sources cited by the tools used for this answer.
    pub sources: Vec<Source>,
    pub session_id: String,
}

/// Catalog summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// Course question answering over indexed course materials.
pub struct RagSystem {
    vector_store: Arc<VectorStore>,
    generator: AIGenerator,
    tools: ToolManager,
    sessions: SessionManager,
    /// Serializes queries so tool sources never mix between requests.
    query_lock: Mutex<()>,
}

impl RagSystem {
    /// Build every component from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
        let vector_store = Arc::new(VectorStore::from_settings(settings)?);
        let generator = AIGenerator::from_settings(&settings.llm, prompts.generator)?;
        let sessions = SessionManager::new(settings.session.max_history);

        Self::with_components(vector_store, generator, sessions)
    }

    /// Assemble a system from existing components and register the course tools.
    pub fn with_components(
        vector_store: Arc<VectorStore>,
        generator: AIGenerator,
        sessions: SessionManager,
    ) -> Result<Self> {
        let mut tools = ToolManager::new();
        tools.register_tool(Box::new(CourseSearchTool::new(vector_store.clone())))?;
        tools.register_tool(Box::new(CourseOutlineTool::new(vector_store.clone())))?;

        Ok(Self {
            vector_store,
            generator,
            tools,
            sessions,
            query_lock: Mutex::new(()),
        })
    }

    pub fn vector_store(&self) -> &Arc<VectorStore> {
        &self.vector_store
    }

    pub fn tool_manager(&self) -> &ToolManager {
        &self.tools
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Answer a query, continuing `session_id` or starting a new session.
    #[instrument(skip(self, query), fields(session = ?session_id))]
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> Result<RagResponse> {
        let _guard = self.query_lock.lock().await;

        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.sessions.create_session()?,
        };

        let prompt = format!("Answer this question about course materials: {}", query);
        let history = self.sessions.get_conversation_history(&session_id)?;

        let answer = self
            .generator
            .generate(&prompt, history.as_deref(), Some(&self.tools))
            .await;

        let sources = self.tools.get_last_sources();
        self.tools.reset_sources();

        self.sessions.add_exchange(&session_id, query, &answer)?;
        info!("Answered query with {} sources", sources.len());

        Ok(RagResponse {
            answer,
            sources,
            session_id,
        })
    }

    /// Index one course and its chunks. Returns the number of chunks added.
    pub async fn add_course(&self, course: &Course, chunks: &[CourseChunk]) -> Result<usize> {
        ingest::add_course(&self.vector_store, course, chunks).await
    }

    /// Index every course bundle in `dir`. See [`ingest::add_course_folder`].
    pub async fn add_course_folder(&self, dir: &Path, clear_existing: bool) -> Result<(usize, usize)> {
        ingest::add_course_folder(&self.vector_store, dir, clear_existing).await
    }

    /// Number and titles of indexed courses.
    pub async fn get_course_analytics(&self) -> Result<CourseAnalytics> {
        Ok(CourseAnalytics {
            total_courses: self.vector_store.get_course_count().await?,
            course_titles: self.vector_store.get_existing_course_titles().await?,
        })
    }
}
