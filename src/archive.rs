use crate::api::github::GithubStore;
use crate::artwork::ImageArtifact;
use crate::config::Config;
use crate::error::StageError;
use crate::story::StoryArtifact;
use crate::video::MediaArtifact;
use crate::{logi, logok, logw};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::Client;

/// A remote place that accepts whole files.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn put_file(&self, path: &str, message: &str, content: &[u8]) -> Result<(), StageError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReceipt {
    /// Always true: archival problems never fail a request.
    pub success: bool,
    /// Remote folder, set once every file was uploaded.
    pub folder: Option<String>,
    pub warning: Option<StageError>,
}

impl ArchiveReceipt {
    fn skipped(warning: StageError) -> Self {
        Self {
            success: true,
            folder: None,
            warning: Some(warning),
        }
    }
}

pub fn folder_name(now: DateTime<Local>) -> String {
    now.format("content_%Y%m%d_%H%M%S").to_string()
}

pub fn commit_message(title: &str) -> String {
    format!("Add generated content: {}", title.trim())
}

pub struct ArchivalSink {
    store: Result<Box<dyn ArchiveStore>, StageError>,
}

impl ArchivalSink {
    pub fn new(store: impl ArchiveStore + 'static) -> Self {
        Self {
            store: Ok(Box::new(store)),
        }
    }

    /// A sink that skips every upload and reports `reason`.
    pub fn unconfigured(reason: StageError) -> Self {
        Self { store: Err(reason) }
    }

    pub fn from_config(client: Client, cfg: &Config) -> Self {
        match GithubStore::from_config(client, cfg) {
            Ok(store) => Self::new(store),
            Err(reason) => Self::unconfigured(reason),
        }
    }

    pub async fn archive(
        &self,
        story: &StoryArtifact,
        image: &ImageArtifact,
        media: &MediaArtifact,
        title: &str,
    ) -> ArchiveReceipt {
        self.archive_at(story, image, media, title, Local::now()).await
    }

    async fn archive_at(
        &self,
        story: &StoryArtifact,
        image: &ImageArtifact,
        media: &MediaArtifact,
        title: &str,
        now: DateTime<Local>,
    ) -> ArchiveReceipt {
        let store = match &self.store {
            Ok(store) => store,
            Err(reason) => {
                logw(format!("Archive skipped [{}]: {}", reason.kind(), reason));
                return ArchiveReceipt::skipped(reason.clone());
            }
        };

        let folder = folder_name(now);
        match upload_all(store.as_ref(), &folder, story, image, media, title).await {
            Ok(()) => {
                logok(format!("Archived to {} folder {}", store.name(), folder));
                ArchiveReceipt {
                    success: true,
                    folder: Some(folder),
                    warning: None,
                }
            }
            Err(reason) => {
                logw(format!("Archive incomplete [{}]: {}", reason.kind(), reason));
                ArchiveReceipt::skipped(reason)
            }
        }
    }
}

async fn upload_all(
    store: &dyn ArchiveStore,
    folder: &str,
    story: &StoryArtifact,
    image: &ImageArtifact,
    media: &MediaArtifact,
    title: &str,
) -> Result<(), StageError> {
    let message = commit_message(title);

    let png = image
        .to_png()
        .map_err(|e| StageError::ArchivalFailure(format!("image.png: {e:#}")))?;
    let media_bytes = match media {
        MediaArtifact::Text(text) => text.contents.clone().into_bytes(),
        MediaArtifact::Video(video) => tokio::fs::read(&video.path).await.map_err(|e| {
            StageError::ArchivalFailure(format!("{}: {}", video.path.display(), e))
        })?,
    };

    let files: [(&str, &[u8]); 3] = [
        ("story.md", story.text.as_bytes()),
        ("image.png", &png),
        (media.file_name(), &media_bytes),
    ];
    for (name, content) in files {
        let path = format!("{folder}/{name}");
        logi(format!("Uploading {} ({} bytes)", path, content.len()));
        store.put_file(&path, &message, content).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::provider::Source;
    use crate::request::ImageStyle;
    use crate::video::TextFallbackArtifact;
    use chrono::TimeZone;
    use image::{Rgb, RgbImage};
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct MemoryStore {
        files: Arc<Mutex<Vec<(String, String, Vec<u8>)>>>,
    }

    #[async_trait]
    impl ArchiveStore for MemoryStore {
        fn name(&self) -> &'static str {
            "memory"
        }

        async fn put_file(&self, path: &str, message: &str, content: &[u8]) -> Result<(), StageError> {
            self.files
                .lock()
                .unwrap()
                .push((path.to_string(), message.to_string(), content.to_vec()));
            Ok(())
        }
    }

    struct RejectingStore;

    #[async_trait]
    impl ArchiveStore for RejectingStore {
        fn name(&self) -> &'static str {
            "rejecting"
        }

        async fn put_file(&self, path: &str, _: &str, _: &[u8]) -> Result<(), StageError> {
            Err(StageError::ArchivalFailure(format!("{path}: HTTP 403")))
        }
    }

    fn artifacts() -> (StoryArtifact, ImageArtifact, MediaArtifact) {
        let story = StoryArtifact {
            title: "Tale".into(),
            intro: None,
            body: vec!["One.".into()],
            source: Source::Offline,
            text: "# Tale\n\nOne.\n".into(),
        };
        let image = ImageArtifact {
            pixels: RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])),
            source: Source::Offline,
            style: ImageStyle::Minimalist,
        };
        let media = MediaArtifact::Text(TextFallbackArtifact {
            path: None,
            contents: "# Tale\n\n# Tale\n\nOne.\n".into(),
        });
        (story, image, media)
    }

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 9, 12, 5, 7).unwrap()
    }

    #[test]
    fn folder_is_timestamped() {
        assert_eq!(folder_name(noon()), "content_20260309_120507");
        assert_eq!(commit_message(" Tale "), "Add generated content: Tale");
    }

    #[tokio::test]
    async fn uploads_three_files_into_one_folder() {
        let store = MemoryStore::default();
        let sink = ArchivalSink::new(store.clone());
        let (story, image, media) = artifacts();

        let receipt = sink.archive_at(&story, &image, &media, "Tale", noon()).await;
        assert!(receipt.success);
        assert_eq!(receipt.folder.as_deref(), Some("content_20260309_120507"));
        assert_eq!(receipt.warning, None);

        let files = store.files.lock().unwrap();
        let names: Vec<&str> = files.iter().map(|(p, _, _)| p.as_str()).collect();
        assert_eq!(
            names,
            [
                "content_20260309_120507/story.md",
                "content_20260309_120507/image.png",
                "content_20260309_120507/story.txt",
            ]
        );
        assert!(files.iter().all(|(_, m, _)| m == "Add generated content: Tale"));
        assert_eq!(files[0].2, story.text.as_bytes());
        assert_eq!(&files[1].2[1..4], b"PNG");
    }

    #[tokio::test]
    async fn missing_configuration_still_succeeds() {
        let sink = ArchivalSink::from_config(Client::new(), &Config::default());
        let (story, image, media) = artifacts();
        let receipt = sink.archive(&story, &image, &media, "Tale").await;
        assert!(receipt.success);
        assert_eq!(receipt.folder, None);
        assert_eq!(
            receipt.warning.map(|w| w.kind()),
            Some(ErrorKind::ConfigurationMissing)
        );
    }

    #[tokio::test]
    async fn upload_error_is_only_a_warning() {
        let sink = ArchivalSink::new(RejectingStore);
        let (story, image, media) = artifacts();
        let receipt = sink.archive(&story, &image, &media, "Tale").await;
        assert!(receipt.success);
        assert_eq!(receipt.folder, None);
        assert_eq!(receipt.warning.map(|w| w.kind()), Some(ErrorKind::ArchivalFailure));
    }
}
