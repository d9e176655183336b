use crate::artwork::{CANVAS_SIZE, ImageArtifact};
use crate::config::Config;
use crate::error::StageError;
use crate::logw;
use crate::provider::Generator;
use crate::request::{GenerationRequest, ImageStyle};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const PROVIDER: &str = "stability";
const CFG_SCALE: u32 = 7;
const STEPS: u32 = 30;

#[derive(Debug, Deserialize)]
struct TextToImageResponse {
    #[serde(default)]
    artifacts: Vec<GeneratedArtifact>,
}

#[derive(Debug, Deserialize)]
struct GeneratedArtifact {
    base64: String,
}

pub fn image_prompt(description: &str, style: &ImageStyle) -> String {
    format!(
        "{}, {} style, high quality, detailed",
        description.trim(),
        style.label()
    )
}

pub struct StabilityImageProvider {
    client: Client,
    api_key: Option<String>,
    api_base: String,
    engine: String,
}

impl StabilityImageProvider {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.stability_credential().map(str::to_string),
            api_base: cfg.stability_api_base.trim_end_matches('/').to_string(),
            engine: cfg.stability_engine.clone(),
        }
    }
}

#[async_trait]
impl Generator for StabilityImageProvider {
    type Output = ImageArtifact;

    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ImageArtifact, StageError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(StageError::missing("STABILITY_API_KEY"))?;

        let body = json!({
            "text_prompts": [{"text": image_prompt(&request.image_description, &request.image_style)}],
            "cfg_scale": CFG_SCALE,
            "height": CANVAS_SIZE,
            "width": CANVAS_SIZE,
            "samples": 1,
            "steps": STEPS,
        });

        let url = format!(
            "{}/v1/generation/{}/text-to-image",
            self.api_base, self.engine
        );
        let resp = self
            .client
            .post(url)
            .bearer_auth(key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| StageError::unavailable(PROVIDER, format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            logw(format!("Stability HTTP {}", status.as_u16()));
            if !raw.is_empty() {
                let snippet = raw.chars().take(800).collect::<String>();
                logw(format!("Stability raw body: {}", snippet));
            }
            return Err(StageError::unavailable(
                PROVIDER,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let parsed: TextToImageResponse = resp
            .json()
            .await
            .map_err(|e| StageError::unavailable(PROVIDER, format!("malformed response body: {e}")))?;
        let encoded = parsed
            .artifacts
            .first()
            .ok_or_else(|| StageError::unavailable(PROVIDER, "response carried no artifacts"))?;
        let bytes = STANDARD
            .decode(encoded.base64.trim())
            .map_err(|e| StageError::unavailable(PROVIDER, format!("base64 decode failed: {e}")))?;

        ImageArtifact::from_encoded(&bytes, request.image_style.clone())
            .map_err(|e| StageError::unavailable(PROVIDER, format!("image decode failed: {e}")))
    }
}
