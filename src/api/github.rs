use crate::archive::ArchiveStore;
use crate::config::Config;
use crate::error::StageError;
use crate::logw;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde_json::json;

/// Writes files through the GitHub contents API.
pub struct GithubStore {
    client: Client,
    token: String,
    repo: String,
    branch: Option<String>,
    api_base: String,
}

impl GithubStore {
    pub fn from_config(client: Client, cfg: &Config) -> Result<Self, StageError> {
        let token = cfg
            .github_credential()
            .ok_or(StageError::missing("GITHUB_TOKEN"))?;
        let repo = cfg
            .github_repo
            .as_deref()
            .map(str::trim)
            .filter(|r| r.contains('/'))
            .ok_or(StageError::missing("GITHUB_REPO"))?;

        Ok(Self {
            client,
            token: token.to_string(),
            repo: repo.to_string(),
            branch: cfg.github_branch.clone().filter(|b| !b.trim().is_empty()),
            api_base: cfg.github_api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ArchiveStore for GithubStore {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn put_file(&self, path: &str, message: &str, content: &[u8]) -> Result<(), StageError> {
        let mut body = json!({
            "message": message,
            "content": STANDARD.encode(content),
        });
        if let Some(branch) = &self.branch {
            body["branch"] = json!(branch);
        }

        let url = format!("{}/repos/{}/contents/{}", self.api_base, self.repo, path);
        let resp = self
            .client
            .put(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .json(&body)
            .send()
            .await
            .map_err(|e| StageError::ArchivalFailure(format!("{path}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            if !raw.is_empty() {
                let snippet = raw.chars().take(400).collect::<String>();
                logw(format!("GitHub raw body: {}", snippet));
            }
            return Err(StageError::ArchivalFailure(format!(
                "{path}: HTTP {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> Config {
        Config {
            github_token: Some("ghp_test".into()),
            github_repo: Some("someone/archive".into()),
            github_branch: Some("main".into()),
            github_api_base: server.uri(),
            ..Config::default()
        }
    }

    #[test]
    fn requires_token_and_repo() {
        let cfg = Config::default();
        let err = GithubStore::from_config(Client::new(), &cfg).err().unwrap();
        assert_eq!(err, StageError::missing("GITHUB_TOKEN"));

        let cfg = Config {
            github_token: Some("ghp".into()),
            github_repo: Some("not-a-slug".into()),
            ..Config::default()
        };
        let err = GithubStore::from_config(Client::new(), &cfg).err().unwrap();
        assert_eq!(err, StageError::missing("GITHUB_REPO"));
    }

    #[tokio::test]
    async fn puts_base64_content() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/someone/archive/contents/content_20260101_000000/story.md"))
            .and(header("authorization", "token ghp_test"))
            .and(body_json(json!({
                "message": "Add generated content: T",
                "content": STANDARD.encode(b"# T"),
                "branch": "main",
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let store = GithubStore::from_config(Client::new(), &config(&server)).unwrap();
        store
            .put_file("content_20260101_000000/story.md", "Add generated content: T", b"# T")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejected_upload_is_archival_failure() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(422).set_body_string(r#"{"message":"sha missing"}"#))
            .mount(&server)
            .await;

        let store = GithubStore::from_config(Client::new(), &config(&server)).unwrap();
        let err = store.put_file("x/story.md", "m", b"x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArchivalFailure);
        assert!(err.to_string().contains("HTTP 422"));
    }
}
