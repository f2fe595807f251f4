//! Shared fixtures for unit tests.

use crate::embedding::HashingEmbedder;
use crate::llm::{LlmClient, LlmError, MessageRequest, MessageResponse};
use crate::models::{Course, CourseChunk, Lesson};
use crate::vector_store::{MemoryBackend, VectorStore};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub(crate) const ML_TITLE: &str = "Introduction to Machine Learning";

pub(crate) fn sample_course() -> Course {
    Course {
        title: ML_TITLE.to_string(),
        course_link: Some("https://example.com/ml-course".to_string()),
        instructor: Some("Dr. Smith".to_string()),
        lessons: vec![
            Lesson {
                lesson_number: 1,
                title: "What is Machine Learning?".to_string(),
                lesson_link: Some("https://example.com/ml-course/lesson-1".to_string()),
            },
            Lesson {
                lesson_number: 2,
                title: "Supervised Learning".to_string(),
                lesson_link: Some("https://example.com/ml-course/lesson-2".to_string()),
            },
            Lesson {
                lesson_number: 3,
                title: "Unsupervised Learning".to_string(),
                lesson_link: None,
            },
        ],
    }
}

pub(crate) fn sample_chunks() -> Vec<CourseChunk> {
    vec![
        CourseChunk {
            content: "Machine learning is a subset of artificial intelligence that focuses on algorithms that can learn from data.".to_string(),
            course_title: ML_TITLE.to_string(),
            lesson_number: Some(1),
            chunk_index: 0,
        },
        CourseChunk {
            content: "Supervised learning uses labeled training data to learn a mapping from inputs to outputs.".to_string(),
            course_title: ML_TITLE.to_string(),
            lesson_number: Some(2),
            chunk_index: 1,
        },
        CourseChunk {
            content: "Unsupervised learning finds patterns in data without labeled examples.".to_string(),
            course_title: ML_TITLE.to_string(),
            lesson_number: Some(3),
            chunk_index: 2,
        },
    ]
}

pub(crate) fn empty_store() -> VectorStore {
    VectorStore::new(
        Arc::new(MemoryBackend::new()),
        Arc::new(HashingEmbedder::default()),
        5,
    )
}

pub(crate) async fn populated_store() -> VectorStore {
    let store = empty_store();
    store.add_course_metadata(&sample_course()).await.unwrap();
    store.add_course_content(&sample_chunks()).await.unwrap();
    store
}

/// Model client replaying canned responses and recording every request.
pub(crate) struct ScriptedClient {
    responses: Mutex<VecDeque<Result<MessageResponse, LlmError>>>,
    requests: Mutex<Vec<MessageRequest>>,
}

impl ScriptedClient {
    pub(crate) fn new(responses: Vec<Result<MessageResponse, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<MessageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("script exhausted".to_string())))
    }
}
