//! Model provider client (Mistral HTTP API)
//!
//! Turns saved captions into embedding-ready text, computes embeddings and
//! answers questions against retrieved context. Token and chat model come
//! from the settings record; endpoints and the helper models from config.

use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::config::LlmConfig;
use crate::core::models::{AppError, AppResult, CaptionEntry};
use crate::utils::{build_http_client, ensure_success, get_user_agent};

const REFINE_PROMPT: &str = "You are an AI optimized for knowledge extraction. \
Rewrite the following video transcript segment into a detailed, coherent text suitable for embedding space. \
Preserve all factual details, technical terms, and logical flow. \
Do not summarize too heavily; aim for clarity and density.";

const LLM_TIMEOUT: Duration = Duration::from_secs(120);
const REFINE_CONCURRENCY: usize = 4;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Group caption texts into space-joined chunks of at most `max_chars` bytes.
///
/// A caption longer than the limit on its own becomes a chunk by itself.
pub fn chunk_captions(captions: &[CaptionEntry], max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for caption in captions {
        if !current.is_empty() && current.len() + caption.text.len() > max_chars {
            chunks.push(current.trim().to_string());
            current.clear();
        }
        current.push_str(&caption.text);
        current.push(' ');
    }

    let last = current.trim();
    if !last.is_empty() {
        chunks.push(last.to_string());
    }
    chunks.retain(|chunk| !chunk.is_empty());
    chunks
}

fn answer_system_prompt(context: &str) -> String {
    format!(
        "You are a helpful assistant. Use the following context to answer the user's question.\n\
         If the answer is not in the context, say so.\n\nContext:\n{}",
        context
    )
}

pub struct MistralClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl MistralClient {
    pub fn new(config: LlmConfig) -> AppResult<Self> {
        Ok(Self {
            client: build_http_client(get_user_agent(), LLM_TIMEOUT)?,
            config,
        })
    }

    fn require_token(api_token: &str) -> AppResult<()> {
        if api_token.trim().is_empty() {
            return Err(AppError::Llm(
                "Model provider token is not configured".to_string(),
            ));
        }
        Ok(())
    }

    async fn chat(&self, api_token: &str, model: &str, system: &str, user: &str) -> AppResult<String> {
        Self::require_token(api_token)?;

        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(api_token)
            .json(&request)
            .send()
            .await?;
        let response: ChatResponse = ensure_success(response, AppError::Llm).await?.json().await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Llm("Completion returned no choices".to_string()))
    }

    /// Rewrite transcript chunks into dense text suited for embedding
    pub async fn generate_context_chunks(
        &self,
        api_token: &str,
        captions: &[CaptionEntry],
    ) -> AppResult<Vec<String>> {
        Self::require_token(api_token)?;
        let raw_chunks = chunk_captions(captions, self.config.chunk_chars);
        info!("🧠 Refining {} transcript chunks", raw_chunks.len());

        let total = raw_chunks.len();
        stream::iter(raw_chunks.into_iter().enumerate())
            .map(move |(index, chunk)| async move {
                debug!("Refining chunk {}/{}", index + 1, total);
                let user = format!("Transcript Segment:\n{}", chunk);
                self.chat(api_token, &self.config.refine_model, REFINE_PROMPT, &user)
                    .await
            })
            .buffered(REFINE_CONCURRENCY)
            .try_collect()
            .await
    }

    /// One embedding vector per input chunk, in order
    pub async fn generate_embedding(&self, api_token: &str, chunks: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Self::require_token(api_token)?;
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.config.api_base))
            .bearer_auth(api_token)
            .json(&EmbeddingRequest {
                model: &self.config.embedding_model,
                input: chunks,
            })
            .send()
            .await?;
        let response: EmbeddingResponse = ensure_success(response, AppError::Llm).await?.json().await?;

        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    /// Answer a question using only the supplied context
    pub async fn generate_chatbot_answer(
        &self,
        api_token: &str,
        model: &str,
        question: &str,
        context: &str,
    ) -> AppResult<String> {
        info!("💬 Asking {} a question", model);
        self.chat(api_token, model, &answer_system_prompt(context), question)
            .await
    }
}
