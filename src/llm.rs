//! The inference-endpoint seam: one operation, prompt text in, free-form
//! text out. No structured-output contract exists; the codec is
//! responsible for defensive parsing.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{AgentError, Result};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Stateless, reentrant completion service. Concurrent calls are fine;
/// implementations hold no per-conversation state.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Chat-completions client. Each call is a fresh single-turn request;
/// the prompt templates carry all necessary page context.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiClient {
    /// Read credentials from the environment (a `.env` file is honored).
    /// `OPENAI_API_KEY` is required; `APPLYBOT_MODEL` and
    /// `APPLYBOT_ENDPOINT` override the defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AgentError::Config("OPENAI_API_KEY not set in environment".into()))?;
        let model =
            std::env::var("APPLYBOT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let endpoint =
            std::env::var("APPLYBOT_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            endpoint,
        })
    }
}

#[async_trait]
impl InferenceClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": 0.2,
            }))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown API error")
                .to_string();
            return Err(AgentError::InferenceStatus {
                status: status.as_u16(),
                message,
            });
        }

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(AgentError::EmptyCompletion)?;
        debug!("model replied with {} chars", content.len());
        Ok(content.to_string())
    }
}

pub mod mock {
    //! Queue-based inference double. Responses are routed by the task
    //! header each prompt template carries, so one mock can script the
    //! verifier and the planner independently inside a single loop run.

    use super::*;
    use crate::codec;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Inner {
        verifications: VecDeque<String>,
        plans: VecDeque<String>,
        scores: VecDeque<String>,
        prompts: Vec<String>,
    }

    #[derive(Clone, Default)]
    pub struct MockInference {
        inner: Arc<Mutex<Inner>>,
    }

    impl MockInference {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for the next verification prompt.
        pub fn with_verification(self, text: &str) -> Self {
            self.inner
                .lock()
                .unwrap()
                .verifications
                .push_back(text.to_string());
            self
        }

        /// Queue a response for the next plan prompt (navigation or form).
        pub fn with_plan(self, text: &str) -> Self {
            self.inner.lock().unwrap().plans.push_back(text.to_string());
            self
        }

        /// Queue a response for the next relevance-scoring prompt.
        pub fn with_score(self, text: &str) -> Self {
            self.inner
                .lock()
                .unwrap()
                .scores
                .push_back(text.to_string());
            self
        }

        pub fn prompts(&self) -> Vec<String> {
            self.inner.lock().unwrap().prompts.clone()
        }

        /// How many prompts of a given task kind were issued.
        pub fn prompt_count(&self, task_tag: &str) -> usize {
            self.inner
                .lock()
                .unwrap()
                .prompts
                .iter()
                .filter(|p| p.contains(task_tag))
                .count()
        }
    }

    #[async_trait]
    impl InferenceClient for MockInference {
        async fn complete(&self, prompt: &str) -> Result<String> {
            let mut inner = self.inner.lock().unwrap();
            inner.prompts.push(prompt.to_string());

            if prompt.contains(codec::VERIFY_TASK) {
                return Ok(inner.verifications.pop_front().unwrap_or_else(|| {
                    r#"{"success": false, "confidence": 0.0, "missing_requirements": []}"#.into()
                }));
            }
            if prompt.contains(codec::NAV_PLAN_TASK) || prompt.contains(codec::FORM_PLAN_TASK) {
                return Ok(inner.plans.pop_front().unwrap_or_else(|| {
                    r#"{"status": "error", "message": "no plan scripted", "actions": []}"#.into()
                }));
            }
            if prompt.contains(codec::RELEVANCE_TASK) {
                return Ok(inner
                    .scores
                    .pop_front()
                    .unwrap_or_else(|| r#"{"relevance": 0.0}"#.into()));
            }

            Ok("{}".to_string())
        }
    }
}
