//! Answer generation with bounded sequential tool rounds.

use super::tools::ToolManager;
use crate::config::{GeneratorPrompts, LlmSettings, Prompts};
use crate::error::Result;
use crate::llm::{
    AnthropicClient, ContentBlock, LlmClient, LlmError, Message, MessageContent, MessageRequest,
    MessageResponse, Role, ToolChoice, ToolDefinition,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Returned when the model's final response carries no text block.
const NO_TEXT_RESPONSE: &str =
    "I wasn't able to produce an answer from the information gathered.";

/// Assistant text shorter than this is not worth salvaging after a failure.
const MIN_SALVAGE_CHARS: usize = 20;

/// Generates answers, letting the model call tools for a bounded number of rounds.
pub struct AIGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_rounds: usize,
    prompts: GeneratorPrompts,
}

impl AIGenerator {
    /// Create a generator with default parameters and prompts.
    pub fn new(client: Arc<dyn LlmClient>, model: &str) -> Self {
        let defaults = LlmSettings::default();
        Self {
            client,
            model: model.to_string(),
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            max_rounds: defaults.max_tool_rounds,
            prompts: GeneratorPrompts::default(),
        }
    }

    /// Create a generator talking to the Messages API configured in settings.
    pub fn from_settings(settings: &LlmSettings, prompts: GeneratorPrompts) -> Result<Self> {
        let client = Arc::new(AnthropicClient::from_settings(settings)?);
        Ok(Self::new(client, &settings.model)
            .with_temperature(settings.temperature)
            .with_max_tokens(settings.max_tokens)
            .with_max_rounds(settings.max_tool_rounds)
            .with_prompts(prompts))
    }

    pub fn with_prompts(mut self, prompts: GeneratorPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the maximum number of tool rounds per query.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Generate an answer to `query`.
    ///
    /// Never fails: model and tool errors are turned into user-facing text.
    #[instrument(skip_all, fields(query_len = query.len(), has_history = history.is_some()))]
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&ToolManager>,
    ) -> String {
        let system = match history.filter(|h| !h.is_empty()) {
            Some(history) => format!("{}\n\nPrevious conversation:\n{}", self.prompts.system, history),
            None => self.prompts.system.clone(),
        };

        let definitions = tools
            .map(ToolManager::get_tool_definitions)
            .filter(|definitions| !definitions.is_empty());

        let messages = vec![Message::user(query)];
        let request = self.request(system.clone(), messages.clone(), definitions.clone());

        let response = match self.client.create_message(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Initial model call failed: {}", e);
                return e.user_message();
            }
        };

        match (tools, definitions) {
            (Some(manager), Some(definitions)) if response.requests_tool_use() => {
                self.run_tool_rounds(response, messages, &system, definitions, manager)
                    .await
            }
            _ => final_text(&response),
        }
    }

    async fn run_tool_rounds(
        &self,
        mut response: MessageResponse,
        mut messages: Vec<Message>,
        base_system: &str,
        definitions: Vec<ToolDefinition>,
        manager: &ToolManager,
    ) -> String {
        let mut round = 1;

        while round <= self.max_rounds && response.requests_tool_use() {
            info!("Tool round {}/{}", round, self.max_rounds);

            messages.push(Message::assistant_blocks(response.content.clone()));
            let results = execute_tool_calls(&response, manager).await;
            if !results.is_empty() {
                messages.push(Message::user_blocks(results));
            }

            let offered = (round < self.max_rounds).then(|| definitions.clone());
            let request = self.request(
                self.round_system_prompt(base_system, round),
                messages.clone(),
                offered,
            );

            match self.client.create_message(&request).await {
                Ok(next) => {
                    response = next;
                    round += 1;
                }
                Err(e) if round == 1 => {
                    warn!("Model call failed after first tool round: {}", e);
                    return format!("Error during tool execution: {}", e);
                }
                Err(e) => {
                    warn!("Model call failed in round {}: {}", round, e);
                    return salvage_partial_answer(&messages, &e);
                }
            }
        }

        final_text(&response)
    }

    /// Base system prompt annotated with guidance for the given round.
    pub fn round_system_prompt(&self, base: &str, round: usize) -> String {
        let template = if round > self.max_rounds {
            &self.prompts.exhausted
        } else if round == self.max_rounds {
            &self.prompts.final_round
        } else {
            &self.prompts.first_round
        };

        let mut vars = HashMap::new();
        vars.insert("round".to_string(), round.to_string());
        vars.insert("max_rounds".to_string(), self.max_rounds.to_string());

        format!("{}\n\n{}", base, Prompts::render(template, &vars))
    }

    fn request(
        &self,
        system: String,
        messages: Vec<Message>,
        tools: Option<Vec<ToolDefinition>>,
    ) -> MessageRequest {
        let tool_choice = tools.as_ref().map(|_| ToolChoice::Auto);
        MessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system,
            messages,
            tools,
            tool_choice,
        }
    }
}

/// Run every tool call in the response, in order. Failures become error results.
async fn execute_tool_calls(response: &MessageResponse, manager: &ToolManager) -> Vec<ContentBlock> {
    let mut results = Vec::new();

    for (id, name, input) in response.tool_uses() {
        debug!("Executing tool {} ({})", name, id);
        let (content, is_error) = match manager.execute_tool(name, input).await {
            Ok(text) => (text, false),
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                (format!("Tool execution error: {}", e), true)
            }
        };

        results.push(ContentBlock::ToolResult {
            tool_use_id: id.to_string(),
            content,
            is_error,
        });
    }

    results
}

fn final_text(response: &MessageResponse) -> String {
    match response.first_text() {
        Some(text) => text.to_string(),
        None => {
            warn!("Final model response had no text");
            NO_TEXT_RESPONSE.to_string()
        }
    }
}

/// Recover the latest substantial assistant text after a failed round.
fn salvage_partial_answer(messages: &[Message], error: &LlmError) -> String {
    let partial = messages
        .iter()
        .rev()
        .filter(|message| message.role == Role::Assistant)
        .find_map(|message| match &message.content {
            MessageContent::Text(text) => substantial(text),
            MessageContent::Blocks(blocks) => blocks.iter().find_map(|block| match block {
                ContentBlock::Text { text } => substantial(text),
                _ => None,
            }),
        });

    match partial {
        Some(text) => format!(
            "{}\n\n(Note: Additional information gathering was interrupted due to an error: {})",
            text, error
        ),
        None => format!(
            "I encountered an error while processing your request and was unable to provide a complete response: {}",
            error
        ),
    }
}

fn substantial(text: &str) -> Option<&str> {
    (text.trim().chars().count() > MIN_SALVAGE_CHARS).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{CourseOutlineTool, CourseSearchTool, Tool, ToolOutput};
    use crate::error::CourseRagError;
    use crate::test_support::{populated_store, ScriptedClient};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    fn tool_call(id: &str, name: &str, input: Value) -> ContentBlock {
        ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }
    }

    fn search_call(id: &str, query: &str) -> MessageResponse {
        MessageResponse::tool_use(vec![tool_call(
            id,
            "search_course_content",
            json!({"query": query}),
        )])
    }

    async fn course_tools() -> ToolManager {
        let store = Arc::new(populated_store().await);
        let mut manager = ToolManager::new();
        manager
            .register_tool(Box::new(CourseSearchTool::new(store.clone())))
            .unwrap();
        manager
            .register_tool(Box::new(CourseOutlineTool::new(store)))
            .unwrap();
        manager
    }

    fn generator(client: &Arc<ScriptedClient>) -> AIGenerator {
        AIGenerator::new(client.clone(), "test-model")
    }

    fn tool_results(message: &Message) -> Vec<(String, String)> {
        match &message.content {
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        ..
                    } => Some((tool_use_id.clone(), content.clone())),
                    _ => None,
                })
                .collect(),
            MessageContent::Text(_) => Vec::new(),
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing_tool"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {}, "required": []})
        }

        async fn execute(&self, _input: &Value) -> Result<ToolOutput> {
            Err(CourseRagError::Tool("Tool failed".to_string()))
        }
    }

    #[tokio::test]
    async fn test_direct_answer_without_tools() {
        let client = ScriptedClient::new(vec![Ok(MessageResponse::text("Paris"))]);

        let answer = generator(&client)
            .generate("What is the capital of France?", None, None)
            .await;

        assert_eq!(answer, "Paris");
        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_none());
        assert!(requests[0].tool_choice.is_none());
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].max_tokens, 800);
        assert_eq!(requests[0].messages, vec![Message::user("What is the capital of France?")]);
    }

    #[tokio::test]
    async fn test_history_in_system_prompt() {
        let client = ScriptedClient::new(vec![Ok(MessageResponse::text("ok"))]);

        generator(&client)
            .generate("follow up", Some("User: hi\nAssistant: hello"), None)
            .await;

        let system = &client.requests()[0].system;
        assert!(system.starts_with(&GeneratorPrompts::default().system));
        assert!(system.ends_with("\n\nPrevious conversation:\nUser: hi\nAssistant: hello"));
    }

    #[tokio::test]
    async fn test_single_tool_round() {
        let client = ScriptedClient::new(vec![
            Ok(search_call("toolu_1", "machine learning")),
            Ok(MessageResponse::text("Machine learning is a subset of AI.")),
        ]);
        let tools = course_tools().await;

        let answer = generator(&client)
            .generate("What is machine learning?", None, Some(&tools))
            .await;

        assert_eq!(answer, "Machine learning is a subset of AI.");
        let requests = client.requests();
        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(2));
        assert_eq!(requests[0].tool_choice, Some(ToolChoice::Auto));

        // user query, assistant tool use, user tool results
        let messages = &requests[1].messages;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[2].role, Role::User);
        let results = tool_results(&messages[2]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "toolu_1");
        assert!(results[0].1.contains("Introduction to Machine Learning"));

        // A second round is still available.
        assert!(requests[1].tools.is_some());
        assert!(requests[1].system.contains("Round 1/2"));
        assert!(requests[1].system.contains("first opportunity"));

        assert!(!tools.get_last_sources().is_empty());
    }

    #[tokio::test]
    async fn test_two_rounds_then_tools_withheld() {
        let client = ScriptedClient::new(vec![
            Ok(MessageResponse::tool_use(vec![tool_call(
                "toolu_1",
                "get_course_outline",
                json!({"course_name": "Machine Learning"}),
            )])),
            Ok(search_call("toolu_2", "supervised")),
            Ok(MessageResponse::text("Lesson 2 covers supervised learning.")),
        ]);
        let tools = course_tools().await;

        let answer = generator(&client)
            .generate("What does lesson 2 cover?", None, Some(&tools))
            .await;

        assert_eq!(answer, "Lesson 2 covers supervised learning.");
        let requests = client.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].messages.len(), 5);
        assert!(requests[2].tools.is_none());
        assert!(requests[2].tool_choice.is_none());
        assert!(requests[2].system.contains("Round 2/2"));
        assert!(requests[2].system.contains("final tool call opportunity"));
    }

    #[tokio::test]
    async fn test_round_limit_stops_persistent_tool_use() {
        let client = ScriptedClient::new(vec![
            Ok(search_call("toolu_1", "learning")),
            Ok(search_call("toolu_2", "learning")),
            Ok(MessageResponse::tool_use(vec![
                ContentBlock::text("Here is what I found so far."),
                tool_call("toolu_3", "search_course_content", json!({"query": "more"})),
            ])),
        ]);
        let tools = course_tools().await;

        let answer = generator(&client).generate("q", None, Some(&tools)).await;

        assert_eq!(client.requests().len(), 3);
        assert_eq!(answer, "Here is what I found so far.");
    }

    #[tokio::test]
    async fn test_early_termination() {
        let client = ScriptedClient::new(vec![
            Ok(search_call("toolu_1", "learning")),
            Ok(MessageResponse::text("Done after one round.")),
            Ok(MessageResponse::text("never requested")),
        ]);
        let tools = course_tools().await;

        let answer = generator(&client).generate("q", None, Some(&tools)).await;

        assert_eq!(answer, "Done after one round.");
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_tool_use_ignored_without_tools() {
        let client = ScriptedClient::new(vec![Ok(MessageResponse::tool_use(vec![
            ContentBlock::text("Let me search."),
            tool_call("toolu_1", "search_course_content", json!({"query": "x"})),
        ]))]);

        let answer = generator(&client).generate("q", None, None).await;

        assert_eq!(answer, "Let me search.");
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_tool_does_not_block_others() {
        let client = ScriptedClient::new(vec![
            Ok(MessageResponse::tool_use(vec![
                tool_call("toolu_1", "failing_tool", json!({})),
                tool_call("toolu_2", "search_course_content", json!({"query": "learning"})),
                tool_call("toolu_3", "no_such_tool", json!({})),
            ])),
            Ok(MessageResponse::text("answer")),
        ]);
        let mut tools = course_tools().await;
        tools.register_tool(Box::new(FailingTool)).unwrap();

        let answer = generator(&client).generate("q", None, Some(&tools)).await;

        assert_eq!(answer, "answer");
        let requests = client.requests();
        let results = tool_results(&requests[1].messages[2]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "toolu_1");
        assert_eq!(results[0].1, "Tool execution error: Tool error: Tool failed");
        assert!(results[1].1.contains("Introduction to Machine Learning"));
        assert_eq!(results[2].1, "Tool 'no_such_tool' not found");
    }

    #[tokio::test]
    async fn test_error_after_first_round() {
        let client = ScriptedClient::new(vec![
            Ok(search_call("toolu_1", "learning")),
            Err(LlmError::Transport("connection reset".to_string())),
        ]);
        let tools = course_tools().await;

        let answer = generator(&client).generate("q", None, Some(&tools)).await;

        assert_eq!(
            answer,
            "Error during tool execution: Transport error: connection reset"
        );
    }

    #[tokio::test]
    async fn test_error_in_second_round_salvages_partial_answer() {
        let client = ScriptedClient::new(vec![
            Ok(search_call("toolu_1", "learning")),
            Ok(MessageResponse::tool_use(vec![
                ContentBlock::text("Machine learning learns patterns from data."),
                tool_call("toolu_2", "search_course_content", json!({"query": "more"})),
            ])),
            Err(LlmError::RateLimited("slow down".to_string())),
        ]);
        let tools = course_tools().await;

        let answer = generator(&client).generate("q", None, Some(&tools)).await;

        assert!(answer.starts_with("Machine learning learns patterns from data."));
        assert!(answer.contains(
            "(Note: Additional information gathering was interrupted due to an error: Rate limit exceeded: slow down)"
        ));
    }

    #[tokio::test]
    async fn test_salvaged_answer_keeps_original_whitespace() {
        let client = ScriptedClient::new(vec![
            Ok(search_call("toolu_1", "learning")),
            Ok(MessageResponse::tool_use(vec![
                ContentBlock::text("  Lesson 2 covers supervised learning.\n"),
                tool_call("toolu_2", "search_course_content", json!({"query": "more"})),
            ])),
            Err(LlmError::RateLimited("slow down".to_string())),
        ]);
        let tools = course_tools().await;

        let answer = generator(&client).generate("q", None, Some(&tools)).await;

        assert!(answer.starts_with("  Lesson 2 covers supervised learning.\n\n\n(Note:"));
    }

    #[tokio::test]
    async fn test_error_in_second_round_without_partial_answer() {
        let client = ScriptedClient::new(vec![
            Ok(search_call("toolu_1", "learning")),
            Ok(MessageResponse::tool_use(vec![
                ContentBlock::text("Short."),
                tool_call("toolu_2", "search_course_content", json!({"query": "more"})),
            ])),
            Err(LlmError::Transport("timeout".to_string())),
        ]);
        let tools = course_tools().await;

        let answer = generator(&client).generate("q", None, Some(&tools)).await;

        assert_eq!(
            answer,
            "I encountered an error while processing your request and was unable to provide a complete response: Transport error: timeout"
        );
    }

    #[tokio::test]
    async fn test_initial_error_mapping() {
        let cases = [
            (
                LlmError::CreditExhausted("Your credit balance is too low".to_string()),
                "API credit exhaustion",
            ),
            (
                LlmError::BadRequest("bad model".to_string()),
                "API configuration error",
            ),
            (
                LlmError::RateLimited("slow".to_string()),
                "too many requests",
            ),
            (
                LlmError::Api {
                    status: 500,
                    message: "oops".to_string(),
                },
                "technical difficulties",
            ),
            (
                LlmError::Transport("dns".to_string()),
                "An unexpected error occurred",
            ),
        ];

        for (error, expected) in cases {
            let client = ScriptedClient::new(vec![Err(error)]);
            let answer = generator(&client).generate("q", None, None).await;
            assert!(answer.contains(expected), "{} missing from {}", expected, answer);
        }
    }

    #[tokio::test]
    async fn test_missing_text_in_final_response() {
        let client = ScriptedClient::new(vec![Ok(MessageResponse {
            id: String::new(),
            stop_reason: None,
            content: Vec::new(),
        })]);

        let answer = generator(&client).generate("q", None, None).await;
        assert_eq!(answer, NO_TEXT_RESPONSE);
    }

    #[test]
    fn test_round_system_prompt() {
        let client = ScriptedClient::new(Vec::new());
        let generator = generator(&client);

        let first = generator.round_system_prompt("Base", 1);
        assert!(first.starts_with("Base\n\n"));
        assert!(first.contains("Round 1/2"));
        assert!(first.contains("first opportunity"));

        let last = generator.round_system_prompt("Base", 2);
        assert!(last.contains("Round 2/2"));
        assert!(last.contains("final tool call opportunity"));

        assert!(generator
            .round_system_prompt("Base", 3)
            .contains("No more tool calls"));
    }
}
