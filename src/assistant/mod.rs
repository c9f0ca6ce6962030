//! AI assistant
//!
//! Suggestions, board analyses and a chat companion built on a [`Provider`].
//! Suggestions swallow failures (an empty result just means "no suggestion");
//! analyses and chat return errors so the caller can show them inline.

use crate::config::ModelConfig;
use crate::okr::Goal;
use crate::provider::{CompletionRequest, ImageRequest, Message, Provider};
use crate::task::Task;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Reply used when the model answers with nothing
pub const EMPTY_REPLY: &str = "No response.";

/// Greeting that starts a fresh conversation
pub const GREETING: &str = "Hello! I'm the PlanAI assistant. The chat history has been reset.";

/// Shown as the model turn when a chat request fails
pub const CHAT_ERROR_REPLY: &str =
    "I'm having trouble connecting. Please check your network or API key.";

/// A persisted chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_thinking: Option<bool>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ChatRole::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(ChatRole::Model, text)
    }

    fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            is_thinking: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// AI features over a completion provider
#[derive(Clone)]
pub struct Assistant {
    provider: Arc<dyn Provider>,
    models: ModelConfig,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("provider", &self.provider.name())
            .field("models", &self.models)
            .finish()
    }
}

impl Assistant {
    pub fn new(provider: Arc<dyn Provider>, models: ModelConfig) -> Self {
        Self { provider, models }
    }

    pub fn models(&self) -> &ModelConfig {
        &self.models
    }

    async fn ask(&self, model: &str, messages: Vec<Message>) -> Result<String> {
        let response = self
            .provider
            .complete(CompletionRequest::new(model, messages))
            .await
            .with_context(|| format!("{} completion failed", self.provider.name()))?;
        Ok(response.text().trim().to_string())
    }

    /// Three to five actionable subtasks; empty on any failure
    pub async fn suggest_subtasks(&self, title: &str, description: &str) -> Vec<String> {
        let prompt = format!(
            "I have a task: \"{title}\".\n\
             Description: \"{description}\".\n\
             List 3-5 small, concrete, actionable subtasks.\n\
             Return ONLY a JSON array of strings."
        );
        match self.ask(&self.models.fast, vec![Message::user(prompt)]).await {
            Ok(reply) => parse_string_list(&reply).unwrap_or_else(|| {
                tracing::warn!(reply_len = reply.len(), "Unparsable subtask suggestion");
                Vec::new()
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Subtask suggestion failed");
                Vec::new()
            }
        }
    }

    /// Short professional description; empty on failure
    pub async fn suggest_description(&self, title: &str) -> String {
        let prompt = format!(
            "Write a short (2-3 sentence), professional description for the task: \"{title}\". \
             Return only the description."
        );
        self.ask(&self.models.fast, vec![Message::user(prompt)])
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Description suggestion failed");
                String::new()
            })
    }

    /// Strategic read of how tasks line up with the OKRs
    pub async fn analyze_strategy(&self, tasks: &[Task], goals: &[Goal]) -> Result<String> {
        let prompt = strategy_prompt(tasks, goals);
        let reply = self.ask(&self.models.smart, vec![Message::user(prompt)]).await?;
        Ok(non_empty(reply))
    }

    /// Bottleneck analysis of the board
    pub async fn analyze_workflow(&self, tasks: &[Task]) -> Result<String> {
        let prompt = workflow_prompt(tasks);
        let reply = self.ask(&self.models.smart, vec![Message::user(prompt)]).await?;
        Ok(non_empty(reply))
    }

    /// Answer `message` given the prior conversation and the current board
    pub async fn chat(
        &self,
        history: &[ChatMessage],
        message: &str,
        tasks: &[Task],
    ) -> Result<String> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(chat_instruction(tasks)));
        messages.extend(history.iter().map(|m| match m.role {
            ChatRole::User => Message::user(m.text.clone()),
            ChatRole::Model => Message::assistant(m.text.clone()),
        }));
        messages.push(Message::user(message));
        self.ask(&self.models.chat, messages).await
    }

    /// Cover image for a task as a `data:` URL; `None` when nothing came back
    pub async fn generate_task_image(&self, prompt: &str) -> Option<String> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return None;
        }
        match self
            .provider
            .generate_image(ImageRequest::new(&self.models.image, prompt))
            .await
        {
            Ok(Some(image)) => Some(image.to_data_url()),
            Ok(None) => {
                tracing::warn!(model = %self.models.image, "Image reply carried no image");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Image generation failed");
                None
            }
        }
    }
}

fn non_empty(reply: String) -> String {
    if reply.is_empty() {
        EMPTY_REPLY.to_string()
    } else {
        reply
    }
}

/// Parse a JSON array of strings, tolerating a surrounding code fence
pub fn parse_string_list(reply: &str) -> Option<Vec<String>> {
    let body = reply.trim();
    let body = body
        .strip_prefix("```json")
        .or_else(|| body.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(body)
        .trim();
    let items: Vec<String> = serde_json::from_str(body).ok()?;
    Some(
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

fn strategy_prompt(tasks: &[Task], goals: &[Goal]) -> String {
    let tasks_json = json!(
        tasks
            .iter()
            .map(|t| json!({
                "title": t.title,
                "status": t.status,
                "priority": t.priority,
                "assignee": t.assignee,
                "outcome": t.outcome,
            }))
            .collect::<Vec<_>>()
    );
    let goals_json = if goals.is_empty() {
        "N/A".to_string()
    } else {
        json!(
            goals
                .iter()
                .map(|g| json!({
                    "objective": g.title,
                    "progress": g.progress,
                    "krs": g
                        .key_results
                        .iter()
                        .map(|k| format!("{} ({}/{})", k.title, k.current_value, k.target_value))
                        .collect::<Vec<_>>(),
                }))
                .collect::<Vec<_>>()
        )
        .to_string()
    };
    format!(
        "Data:\nTasks: {tasks_json}\nOKRs: {goals_json}\n\n\
         Role: CEO and head of strategy.\n\
         Request: analyze how the tasks support the OKRs. Point out risks and three concrete \
         executive actions. Answer in Markdown."
    )
}

fn workflow_prompt(tasks: &[Task]) -> String {
    let board = json!(
        tasks
            .iter()
            .map(|t| json!({
                "status": t.status,
                "assignee": t.assignee,
                "priority": t.priority,
            }))
            .collect::<Vec<_>>()
    );
    format!(
        "Role: Agile coach.\nKanban data: {board}\n\
         Request: find bottlenecks and suggest how to improve the flow of work. Answer in Markdown."
    )
}

fn chat_instruction(tasks: &[Task]) -> String {
    let mut instruction = String::from(
        "You are PlanAI, a project management assistant for executives. \
         Answer concisely and professionally.",
    );
    if !tasks.is_empty() {
        let context: Vec<String> = tasks
            .iter()
            .map(|t| format!("{} - {}", t.title, t.status.as_str()))
            .collect();
        instruction.push_str(&format!("\nContext: {}", json!(context)));
    }
    instruction
}
