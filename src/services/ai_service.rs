use crate::error::{Error, Result};
use crate::models::candidate::AnalysisJob;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = r#"You are a senior technical recruiter.
Read the candidate's profile summary and write a short, objective analysis for the hiring team.

Cover, in at most five sentences:
1. The candidate's main strengths.
2. Gaps or risks worth probing in an interview.
3. Whether the stated seniority looks consistent with the summary.

Answer in plain text, without markdown headings."#;

/// Produces a free-text analysis of a claimed candidate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CandidateAnalyzer: Send + Sync {
    async fn analyze(&self, job: &AnalysisJob) -> Result<String>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// OpenAI chat-completions backed analyzer.
#[derive(Clone)]
pub struct OpenAiAnalyzer {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiAnalyzer {
    pub fn new(api_key: String, model: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn chat_openai(&self, user_content: &str) -> Result<String> {
        let payload = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            temperature: 0.3,
        };

        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("OpenAI API Error {}: {}", status, text).into());
        }

        let body: ChatResponse = res.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Internal("Invalid OpenAI response format".to_string()))
    }
}

pub fn build_user_prompt(job: &AnalysisJob, summary: &str) -> String {
    format!(
        "Candidate: {}\nDeclared seniority: {}\n\nProfile summary:\n{}",
        job.name, job.seniority, summary
    )
}

#[async_trait]
impl CandidateAnalyzer for OpenAiAnalyzer {
    async fn analyze(&self, job: &AnalysisJob) -> Result<String> {
        let summary = job
            .profile_summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::BadRequest("candidate has no profile summary".to_string()))?;

        tracing::debug!(candidate_id = %job.id, model = %self.model, "requesting profile analysis");
        self.chat_openai(&build_user_prompt(job, summary)).await
    }
}
