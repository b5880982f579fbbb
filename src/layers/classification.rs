use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::layers::GroupMapping;
use crate::layers::parsing::{groups_or_empty, groups_or_uncategorized};

pub const CLASSIFIER_PROMPT: &str = "You are a classification expert for academic papers.

When given a user's instruction to classify a list of paper titles \
(e.g., by topic, method, year), you must:
- Parse the instruction and identify the grouping dimension
- Read all the titles provided
- Return a JSON object where each key is a category label, \
and the value is a list of paper titles under that category

Do not explain. Do not include extra text. Output only the JSON object.";

/// User message asking the model to group `titles` by `criteria`.
pub fn classification_prompt(criteria: &str, titles: &[String]) -> Result<String> {
    let listing = serde_json::to_string_pretty(titles)?;
    Ok(format!(
        "Classify the following paper titles by: '{}'.\n\
         Return a JSON object where each key is a group name \
         and the value is a list of paper titles.\n\n\
         Titles:\n{}",
        criteria, listing
    ))
}

/// A text-completion service that answers a user message under a system message.
#[async_trait]
pub trait CompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionsClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl ChatCompletionsClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionsClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        tracing::info!("Requesting classification from {} ({})", url, self.model);
        let resp = request.send().await.map_err(|e| anyhow!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(anyhow!("Completion API error: {}", resp.status()));
        }
        let reply: ChatResponse = resp.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Completion API returned no content"))
    }
}

/// Asks a language model to group paper titles. Unusable replies are replaced
/// by a catch-all group so callers always receive a mapping.
pub struct Classifier<C: CompletionClient> {
    client: C,
}

impl<C: CompletionClient> Classifier<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Groups `titles` by `criteria`; falls back to all titles under one group.
    pub async fn classify_titles(&self, titles: &[String], criteria: &str) -> Result<GroupMapping> {
        let prompt = classification_prompt(criteria, titles)?;
        let reply = self.client.complete(CLASSIFIER_PROMPT, &prompt).await?;
        tracing::debug!("Classification reply: {}", reply);
        Ok(groups_or_uncategorized(&reply, titles))
    }

    /// Sends an already composed prompt; falls back to an empty catch-all group.
    pub async fn classify_prompt(&self, prompt: &str) -> Result<GroupMapping> {
        let reply = self.client.complete(CLASSIFIER_PROMPT, prompt).await?;
        tracing::debug!("Classification reply: {}", reply);
        Ok(groups_or_empty(&reply))
    }
}
