use crate::config::Config;
use crate::error::StageError;
use crate::logw;
use crate::provider::Generator;
use crate::request::GenerationRequest;
use crate::story::StoryArtifact;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

const PROVIDER: &str = "openai";
const MAX_TOPIC_BYTES: usize = 2_000;

fn trim_copy_utf8_safe(input: &str, max_bytes: usize) -> String {
    if input.len() <= max_bytes {
        return input.to_string();
    }

    let mut cut = max_bytes.min(input.len());
    while cut > 0 && !input.is_char_boundary(cut) {
        cut -= 1;
    }
    input[..cut].to_string()
}

fn openai_extract_completion_text(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;

    if let Some(err) = root.get("error") {
        if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
            logw(format!("OpenAI error message: {}", msg));
        }
        if let Some(typ) = err.get("type").and_then(|v| v.as_str()) {
            logw(format!("OpenAI error type: {}", typ));
        }
        if let Some(code) = err.get("code").and_then(|v| v.as_str()) {
            logw(format!("OpenAI error code: {}", code));
        }
        return None;
    }

    let text = root
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()?;

    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// System and user messages for a story request.
pub fn story_messages(request: &GenerationRequest) -> (String, String) {
    let style = request.narrative_style.label();
    let topic = trim_copy_utf8_safe(request.topic.trim(), MAX_TOPIC_BYTES);
    let system = format!(
        "You are a creative writer who specializes in {style} stories. \
         Write vivid, well-paced prose split into short paragraphs."
    );
    let user = format!(
        "Write a {style} story about {topic} with approximately {} words. \
         Start with a title formatted as a markdown heading and separate paragraphs with blank lines.",
        request.length.word_budget()
    );
    (system, user)
}

pub struct OpenAiStoryProvider {
    client: Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
}

impl OpenAiStoryProvider {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.openai_credential().map(str::to_string),
            api_base: cfg.openai_api_base.trim_end_matches('/').to_string(),
            model: cfg.story_model.clone(),
        }
    }
}

#[async_trait]
impl Generator for OpenAiStoryProvider {
    type Output = StoryArtifact;

    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<StoryArtifact, StageError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(StageError::missing("OPENAI_API_KEY"))?;

        let (system, user) = story_messages(request);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.api_base))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StageError::unavailable(PROVIDER, format!("request failed: {e}")))?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            logw(format!("OpenAI HTTP {}", status.as_u16()));
            if !raw.is_empty() {
                let snippet = raw.chars().take(800).collect::<String>();
                logw(format!("OpenAI raw body: {}", snippet));
            }
            return Err(StageError::unavailable(
                PROVIDER,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let text = openai_extract_completion_text(&raw)
            .ok_or_else(|| StageError::unavailable(PROVIDER, "malformed response body"))?;

        StoryArtifact::from_provider_text(&text, &request.topic)
            .ok_or_else(|| StageError::unavailable(PROVIDER, "completion has no story paragraphs"))
    }
}
