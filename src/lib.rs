pub mod api;
pub mod archive;
pub mod artwork;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod font;
pub mod init;
pub mod pipeline;
pub mod provider;
pub mod request;
pub mod story;
pub mod video;

pub use config::Config;
pub use error::{ErrorKind, StageError};
pub use pipeline::{Pipeline, PipelineResult, PipelineState};
pub use request::{GenerationRequest, ImageStyle, NarrativeStyle, StoryLength};

pub(crate) fn logi(message: impl AsRef<str>) {
    tracing::info!("{}", message.as_ref());
}

pub(crate) fn logok(message: impl AsRef<str>) {
    tracing::info!(status = "ok", "{}", message.as_ref());
}

pub(crate) fn logw(message: impl AsRef<str>) {
    tracing::warn!("{}", message.as_ref());
}
