use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "openai_api_key", default)]
    pub openai_key: Option<String>,
    #[serde(default = "default_story_model")]
    pub story_model: String,
    #[serde(default = "default_openai_base")]
    pub openai_api_base: String,

    #[serde(rename = "stability_api_key", default)]
    pub stability_key: Option<String>,
    #[serde(default = "default_stability_engine")]
    pub stability_engine: String,
    #[serde(default = "default_stability_base")]
    pub stability_api_base: String,

    #[serde(default)]
    pub github_token: Option<String>,
    /// `owner/name` of the archive repository.
    #[serde(default)]
    pub github_repo: Option<String>,
    #[serde(default)]
    pub github_branch: Option<String>,
    #[serde(default = "default_github_base")]
    pub github_api_base: String,

    /// Preferred TrueType font for captions; a bitmap font is used when absent.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

fn default_story_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com".to_string()
}

fn default_stability_engine() -> String {
    "stable-diffusion-xl-1024-v1-0".to_string()
}

fn default_stability_base() -> String {
    "https://api.stability.ai".to_string()
}

fn default_github_base() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_frame_rate() -> u32 {
    24
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_key: None,
            story_model: default_story_model(),
            openai_api_base: default_openai_base(),
            stability_key: None,
            stability_engine: default_stability_engine(),
            stability_api_base: default_stability_base(),
            github_token: None,
            github_repo: None,
            github_branch: None,
            github_api_base: default_github_base(),
            font_path: None,
            request_timeout_secs: default_timeout_secs(),
            frame_rate: default_frame_rate(),
        }
    }
}

impl Config {
    /// Reads a JSON config file. Missing credentials are not an error here;
    /// the providers fall back when they find none.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
        Ok(config)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let set = |slot: &mut Option<String>, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = Some(value);
            }
        };
        set(&mut self.openai_key, "OPENAI_API_KEY");
        set(&mut self.stability_key, "STABILITY_API_KEY");
        set(&mut self.github_token, "GITHUB_TOKEN");
        set(&mut self.github_repo, "GITHUB_REPO");
        set(&mut self.github_branch, "GITHUB_BRANCH");
        if let Some(font) = lookup("STORY_FONT").filter(|v| !v.trim().is_empty()) {
            self.font_path = Some(PathBuf::from(font));
        }
        self
    }

    pub fn openai_credential(&self) -> Option<&str> {
        credential(&self.openai_key)
    }

    pub fn stability_credential(&self) -> Option<&str> {
        credential(&self.stability_key)
    }

    pub fn github_credential(&self) -> Option<&str> {
        credential(&self.github_token)
    }
}

fn credential(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
