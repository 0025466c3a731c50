//! Question answering over the knowledge base.
//!
//! [`ask`] ranks stored chunks against the question and hands the best ones
//! to an [`AnswerGenerator`]. When the knowledge base is empty or nothing
//! matches, it answers with a fixed message and never calls the generator.
//!
//! [`ChatCompletionGenerator`] talks to any OpenAI-compatible
//! `POST /chat/completions` endpoint.
//!
//! # Retry Strategy
//!
//! - HTTP 429 and 5xx → retry with exponential backoff (1s, 2s, 4s, …)
//! - Other 4xx → fail immediately
//! - Network errors → retry

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use kb_harness_core::search::rank;
use kb_harness_core::store::KnowledgeStore;

use crate::config::LlmConfig;

/// Returned when the knowledge base holds no chunks at all.
pub const EMPTY_KNOWLEDGE_BASE: &str =
    "The knowledge base is empty. Please upload documents first.";

/// Returned when no chunk shares a keyword with the question.
pub const NO_RELEVANT_CONTENT: &str =
    "Sorry, nothing relevant was found in the knowledge base. Try rephrasing your question.";

/// Separator placed between context chunks in the prompt.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

const SYSTEM_PROMPT: &str = "You are a customer support assistant. Answer the user's question \
using the knowledge base content below, and help resolve the issue on site.";

/// Produces an answer from ranked context chunks.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// `context` is non-empty and ordered best first.
    async fn answer(&self, context: &[String], question: &str) -> Result<String>;
}

/// Answer `question` from the chunks in `store`.
pub async fn ask<S, G>(store: &S, generator: &G, question: &str, top_k: usize) -> Result<String>
where
    S: KnowledgeStore + ?Sized,
    G: AnswerGenerator + ?Sized,
{
    let question = question.trim();
    if question.is_empty() {
        bail!("question must not be empty");
    }

    let chunks = store.read_all().await?;
    if chunks.is_empty() {
        return Ok(EMPTY_KNOWLEDGE_BASE.to_string());
    }

    let context = rank(&chunks, question, top_k);
    tracing::info!(
        total_chunks = chunks.len(),
        context_chunks = context.len(),
        "ranked knowledge base"
    );
    if context.is_empty() {
        return Ok(NO_RELEVANT_CONTENT.to_string());
    }

    generator.answer(&context, question).await
}

/// One chat message in OpenAI wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// System message carrying the context, followed by the user question.
pub fn build_messages(context: &[String], question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system".to_string(),
            content: format!(
                "{}\n\nKnowledge base content:\n{}",
                SYSTEM_PROMPT,
                context.join(CONTEXT_SEPARATOR)
            ),
        },
        ChatMessage {
            role: "user".to_string(),
            content: question.to_string(),
        },
    ]
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// OpenAI-compatible chat-completion client.
pub struct ChatCompletionGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    max_retries: u32,
}

impl ChatCompletionGenerator {
    /// Build a client from config. The API key is read from the environment
    /// now, but a missing key only fails when an answer is requested.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: std::env::var(&config.api_key_env).ok(),
            api_key_env: config.api_key_env.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl AnswerGenerator for ChatCompletionGenerator {
    async fn answer(&self, context: &[String], question: &str) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("{} environment variable not set", self.api_key_env);
        };

        let body = ChatRequest {
            model: &self.model,
            messages: build_messages(context, question),
            temperature: 0.3,
            max_tokens: 1024,
        };

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: ChatResponse = response.json().await?;
                        return parsed
                            .choices
                            .into_iter()
                            .next()
                            .map(|c| c.message.content)
                            .ok_or_else(|| anyhow::anyhow!("LLM API returned no choices"));
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(%status, attempt, "LLM API error, retrying");
                        last_err = Some(anyhow::anyhow!("LLM API error {}: {}", status, body_text));
                        continue;
                    }

                    bail!("LLM API error {}: {}", status, body_text);
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "LLM request failed, retrying");
                    last_err = Some(e.into());
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("LLM request failed after retries")))
    }
}
