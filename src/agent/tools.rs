//! Tool abstraction and the registry that dispatches model tool calls.

use crate::error::{CourseRagError, Result};
use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Where a piece of tool output came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Result of one tool execution: text for the model plus the sources behind it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub sources: Vec<Source>,
}

impl ToolOutput {
    /// Output without sources.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_sources(text: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            text: text.into(),
            sources,
        }
    }
}

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name the model refers to.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the tool input.
    fn input_schema(&self) -> Value;

    /// Execute the tool with model-supplied input.
    async fn execute(&self, input: &Value) -> Result<ToolOutput>;

    /// Model-facing definition of this tool.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

struct RegisteredTool {
    tool: Box<dyn Tool>,
    last_sources: Mutex<Vec<Source>>,
}

impl RegisteredTool {
    fn sources(&self) -> MutexGuard<'_, Vec<Source>> {
        self.last_sources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Registry of tools keyed by name, remembering each tool's latest sources.
///
/// Tools keep their registration order, which decides which tool's sources win in
/// [`ToolManager::get_last_sources`].
#[derive(Default)]
pub struct ToolManager {
    tools: Vec<RegisteredTool>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A tool with the same name is replaced in place.
    pub fn register_tool(&mut self, tool: Box<dyn Tool>) -> Result<()> {
        if tool.name().is_empty() {
            return Err(CourseRagError::InvalidInput(
                "Tool must have a name".to_string(),
            ));
        }

        let entry = RegisteredTool {
            tool,
            last_sources: Mutex::new(Vec::new()),
        };

        match self
            .tools
            .iter_mut()
            .find(|existing| existing.tool.name() == entry.tool.name())
        {
            Some(existing) => {
                debug!("Replacing tool {}", entry.tool.name());
                *existing = entry;
            }
            None => self.tools.push(entry),
        }
        Ok(())
    }

    /// Definitions of every registered tool, in registration order.
    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|entry| entry.tool.definition()).collect()
    }

    /// Execute a tool by name.
    ///
    /// Unknown names are not an error: the returned text tells the model the tool does
    /// not exist.
    pub async fn execute_tool(&self, name: &str, input: &Value) -> Result<String> {
        let Some(entry) = self.tools.iter().find(|entry| entry.tool.name() == name) else {
            warn!("Model requested unknown tool {}", name);
            return Ok(format!("Tool '{}' not found", name));
        };

        let output = entry.tool.execute(input).await?;
        debug!(
            "Tool {} returned {} chars with {} sources",
            name,
            output.text.len(),
            output.sources.len()
        );
        *entry.sources() = output.sources;
        Ok(output.text)
    }

    /// Sources of the first tool, in registration order, whose latest run produced any.
    pub fn get_last_sources(&self) -> Vec<Source> {
        self.tools
            .iter()
            .map(|entry| entry.sources().clone())
            .find(|sources| !sources.is_empty())
            .unwrap_or_default()
    }

    /// Forget the sources recorded by every tool.
    pub fn reset_sources(&self) {
        for entry in &self.tools {
            entry.sources().clear();
        }
    }
}
