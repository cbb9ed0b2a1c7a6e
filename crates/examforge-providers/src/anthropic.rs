//! Anthropic Messages API item writer.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use examforge_core::error::ServiceError;
use examforge_core::model::{ItemBody, ItemType};
use examforge_core::traits::{DraftItem, GenerationRequest, ItemGenerator};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const SYSTEM_PROMPT: &str = "You are an assessment item writer. Respond ONLY with a JSON array \
of item objects. Do not include explanations or markdown formatting. Every item must genuinely \
demand the stated mental action; an item that merely name-drops the topic is wrong.";

/// Anthropic-backed item generator.
pub struct AnthropicWriter {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicWriter {
    pub fn new(api_key: &str, base_url: Option<String>, model: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client,
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Flat wire shape the prompt asks for; converted per requested item type.
#[derive(Debug, Deserialize)]
struct WireDraft {
    stem: String,
    #[serde(default)]
    choices: Option<BTreeMap<String, String>>,
    #[serde(default)]
    correct: Option<String>,
    #[serde(default)]
    answer: Option<bool>,
    #[serde(default)]
    model_answer: Option<String>,
    #[serde(default)]
    rubric: Option<String>,
    #[serde(default)]
    concept: Option<String>,
    #[serde(default)]
    operation: Option<String>,
}

#[async_trait]
impl ItemGenerator for AnthropicWriter {
    fn name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(topic = %request.topic, level = %request.level))]
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Vec<DraftItem>> {
        let start = Instant::now();
        let prompt = build_prompt(request);

        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            temperature: 0.7,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout(DEFAULT_TIMEOUT_SECS)
                } else {
                    ServiceError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let message = response
                .text()
                .await
                .ok()
                .and_then(|text| serde_json::from_str::<AnthropicError>(&text).ok())
                .map(|e| e.error.message)
                .unwrap_or_else(|| "unknown error".to_string());

            let error = match status.as_u16() {
                401 | 403 => ServiceError::AuthenticationFailed(message),
                429 => ServiceError::RateLimited {
                    retry_after_ms: retry_after.map_or(1000, |s| s * 1000),
                },
                code => ServiceError::ApiError {
                    status: code,
                    message,
                },
            };
            return Err(error.into());
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;
        let text = parsed
            .content
            .first()
            .map(|c| c.text.as_str())
            .unwrap_or_default();

        let drafts = parse_drafts(text, request.item_type)?;
        tracing::debug!(
            count = drafts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generation batch complete"
        );
        Ok(drafts)
    }
}

/// Build the generation prompt: topic, level, the cognitive-fidelity
/// contract, the output schema for the requested item type, and one
/// numbered block per intent.
fn build_prompt(request: &GenerationRequest) -> String {
    let mut p = String::new();
    let _ = writeln!(
        p,
        "Write {} exam item(s) on the topic \"{}\" at the {} cognitive level.",
        request.intents.len(),
        request.topic,
        request.level
    );
    let _ = writeln!(
        p,
        "Cognitive contract: every item {}.",
        request.action_contract
    );
    if !request.forbidden_patterns.is_empty() {
        let _ = writeln!(
            p,
            "Never use these phrasings in stems or answers: {}.",
            request
                .forbidden_patterns
                .iter()
                .map(|f| format!("\"{f}\""))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    p.push('\n');
    let schema = match request.item_type {
        ItemType::MultipleChoice => {
            "{\"stem\": string, \"choices\": {\"A\": string, \"B\": string, \"C\": string, \
             \"D\": string}, \"correct\": \"A\"|\"B\"|\"C\"|\"D\", \"concept\": string, \
             \"operation\": string}"
        }
        ItemType::TrueFalse => {
            "{\"stem\": string, \"answer\": true|false, \"concept\": string, \
             \"operation\": string}"
        }
        ItemType::ShortAnswer => {
            "{\"stem\": string, \"model_answer\": string, \"concept\": string, \
             \"operation\": string}"
        }
        ItemType::Essay => {
            "{\"stem\": string, \"rubric\": string, \"concept\": string, \
             \"operation\": string}"
        }
    };
    let _ = writeln!(p, "Return a JSON array where each element matches: {schema}");

    p.push('\n');
    for (i, intent) in request.intents.iter().enumerate() {
        let _ = writeln!(
            p,
            "Item {}: the student must {} the {} of the topic; difficulty {}; worth {} point(s).",
            i + 1,
            intent.operation,
            intent.concept,
            intent.difficulty,
            intent.points
        );
    }
    p
}

/// Parse the model's JSON array, tolerating a fenced code block and
/// skipping elements that do not fit the requested item type.
fn parse_drafts(text: &str, item_type: ItemType) -> anyhow::Result<Vec<DraftItem>> {
    let trimmed = strip_code_fence(text);
    let wire: Vec<WireDraft> = serde_json::from_str(trimmed)
        .map_err(|e| ServiceError::MalformedResponse(format!("bad item JSON: {e}")))?;

    let mut drafts = Vec::with_capacity(wire.len());
    for (i, w) in wire.into_iter().enumerate() {
        match convert_draft(w, item_type) {
            Ok(draft) => drafts.push(draft),
            Err(reason) => tracing::debug!("skipping malformed candidate {i}: {reason}"),
        }
    }
    Ok(drafts)
}

fn convert_draft(wire: WireDraft, item_type: ItemType) -> Result<DraftItem, String> {
    let body = match item_type {
        ItemType::MultipleChoice => {
            let choices = wire.choices.ok_or("missing choices")?;
            let correct = wire.correct.ok_or("missing correct label")?;
            ItemBody::MultipleChoice { choices, correct }
        }
        ItemType::TrueFalse => ItemBody::TrueFalse {
            answer: wire.answer.ok_or("missing answer")?,
        },
        ItemType::ShortAnswer => ItemBody::ShortAnswer {
            model_answer: wire.model_answer.ok_or("missing model answer")?,
        },
        ItemType::Essay => ItemBody::Essay {
            rubric: wire.rubric.ok_or("missing rubric")?,
        },
    };
    Ok(DraftItem {
        text: wire.stem,
        body,
        concept: wire.concept,
        operation: wire.operation,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
