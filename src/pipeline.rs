//! Sequences story, image, media and archive for one request.

use crate::api::openai::OpenAiStoryProvider;
use crate::api::stability::StabilityImageProvider;
use crate::archive::ArchivalSink;
use crate::artwork::{ImageArtifact, OfflineIllustrator};
use crate::config::Config;
use crate::error::StageError;
use crate::font::CaptionFont;
use crate::init::RequestWorkspace;
use crate::provider::{Generated, WithFallback};
use crate::request::GenerationRequest;
use crate::story::{OfflineStoryWriter, StoryArtifact};
use crate::video::{FfmpegEncoder, MediaArtifact, SlideEncoder, VideoAssembler};
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = concat!("ai-story-shorts/", env!("CARGO_PKG_VERSION"));
const IMAGE_FILE: &str = "image.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Requested,
    StoryReady,
    ImageReady,
    MediaReady,
    Archived,
    Done,
}

impl PipelineState {
    pub fn next(self) -> Self {
        match self {
            Self::Requested => Self::StoryReady,
            Self::StoryReady => Self::ImageReady,
            Self::ImageReady => Self::MediaReady,
            Self::MediaReady => Self::Archived,
            Self::Archived | Self::Done => Self::Done,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }
}

#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub story: StoryArtifact,
    pub image: ImageArtifact,
    /// `None` if the PNG could not be written; the bitmap is still in `image`.
    pub image_path: Option<PathBuf>,
    pub media: MediaArtifact,
    pub archived: bool,
    pub archive_folder: Option<String>,
    /// Reasons for every fallback taken, in stage order.
    pub degradations: Vec<StageError>,
    /// `None` if no request directory could be created; artifacts then only
    /// live in memory.
    pub workspace: Option<PathBuf>,
}

pub struct Pipeline {
    story: WithFallback<OfflineStoryWriter>,
    image: WithFallback<OfflineIllustrator>,
    assembler: VideoAssembler,
    archive: ArchivalSink,
    workspace_root: Option<PathBuf>,
}

impl Pipeline {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(cfg.request_timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build reqwest client")?;
        let font = Arc::new(CaptionFont::load(cfg.font_path.as_deref()));

        Ok(Self {
            story: WithFallback::new(OpenAiStoryProvider::new(client.clone(), cfg), OfflineStoryWriter),
            image: WithFallback::new(
                StabilityImageProvider::new(client.clone(), cfg),
                OfflineIllustrator::new(font.clone()),
            ),
            assembler: VideoAssembler::new(font, FfmpegEncoder, cfg.frame_rate),
            archive: ArchivalSink::from_config(client, cfg),
            workspace_root: None,
        })
    }

    pub fn with_encoder(mut self, encoder: impl SlideEncoder + 'static) -> Self {
        self.assembler.set_encoder(encoder);
        self
    }

    pub fn with_archive(mut self, archive: ArchivalSink) -> Self {
        self.archive = archive;
        self
    }

    /// Parent directory for request workspaces; the system temp dir otherwise.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Runs every stage. Failures degrade the result; they never abort it.
    pub async fn run(&self, request: &GenerationRequest) -> PipelineResult {
        let mut state = PipelineState::Requested;
        let mut degradations = Vec::new();

        let workspace = match RequestWorkspace::create(self.workspace_root.as_deref()) {
            Ok(workspace) => {
                logi(format!(
                    "Generating \"{}\" in {}",
                    request.video_title,
                    workspace.path().display()
                ));
                Some(workspace)
            }
            Err(reason) => {
                logw(format!(
                    "Generating \"{}\" without files [{}]: {}",
                    request.video_title,
                    reason.kind(),
                    reason
                ));
                degradations.push(reason);
                None
            }
        };
        let workdir = workspace.as_ref().map(RequestWorkspace::path);

        let story = collect(self.story.generate(request).await, &mut degradations);
        logi(format!("Story: {} paragraphs ({})", story.body.len(), story.source));
        state = advance(state);

        let image = collect(self.image.generate(request).await, &mut degradations);
        let image_path = workspace
            .as_ref()
            .and_then(|ws| save_image(&image, &ws.file(IMAGE_FILE)));
        logi(format!("Image: {} ({})", image.style.label(), image.source));
        state = advance(state);

        let media = collect(
            self.assembler
                .assemble(&story, &image, &request.video_title, workdir)
                .await,
            &mut degradations,
        );
        match media.path() {
            Some(path) => logi(format!("Media: {}", path.display())),
            None => logi("Media: story text kept in memory"),
        }
        state = advance(state);

        let receipt = self
            .archive
            .archive(&story, &image, &media, &request.video_title)
            .await;
        degradations.extend(receipt.warning);
        state = advance(state);

        state = advance(state);
        debug_assert!(state.is_terminal());

        if degradations.is_empty() {
            logok(format!("Finished \"{}\"", request.video_title));
        } else {
            logw(format!(
                "Finished \"{}\" with {} fallback(s)",
                request.video_title,
                degradations.len()
            ));
        }

        PipelineResult {
            story,
            image,
            image_path,
            media,
            archived: receipt.success,
            archive_folder: receipt.folder,
            degradations,
            workspace: workdir.map(Path::to_path_buf),
        }
    }
}

fn advance(state: PipelineState) -> PipelineState {
    let next = state.next();
    tracing::debug!(from = ?state, to = ?next, "pipeline transition");
    next
}

fn collect<T>(generated: Generated<T>, degradations: &mut Vec<StageError>) -> T {
    degradations.extend(generated.fallback);
    generated.artifact
}

fn save_image(image: &ImageArtifact, path: &Path) -> Option<PathBuf> {
    match image.save_png(path) {
        Ok(()) => Some(path.to_path_buf()),
        Err(err) => {
            logw(format!("{err:#}"));
            None
        }
    }
}
