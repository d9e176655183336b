//! Slide planning, frame rendering and encoding of the short video.
//!
//! The story's first paragraphs become captioned slides over the shared
//! still image, preceded by a title slide. If anything on the way to an
//! encoded file fails, the title and full story are written to a text file
//! instead.

use crate::artwork::ImageArtifact;
use crate::error::StageError;
use crate::ffmpeg;
use crate::font::{CaptionFont, wrap_words};
use crate::init::check_ffmpeg;
use crate::provider::Generated;
use crate::story::StoryArtifact;
use crate::{logi, logok, logw};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub const MAX_BODY_SLIDES: usize = 5;
pub const CAPTION_CHARS: usize = 150;
pub const BODY_SLIDE_SECS: u32 = 5;
pub const INTRO_SLIDE_SECS: u32 = 3;

const VIDEO_FILE: &str = "video.mp4";
const TEXT_FILE: &str = "story.txt";

const INTRO_SIZE: f32 = 64.0;
const INTRO_WRAP: usize = 14;
const CAPTION_SIZE: f32 = 24.0;
const CAPTION_WRAP: usize = 38;
const BAND_PADDING: i32 = 20;
const CAPTION_BOTTOM_MARGIN: i32 = 60;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideKind {
    Intro,
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlidePlan {
    pub kind: SlideKind,
    pub caption: String,
    pub duration_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub kind: SlideKind,
    pub caption: String,
    pub duration_secs: u32,
    /// Still image with the caption composited on top.
    pub frame: PathBuf,
}

#[derive(Debug, Clone)]
pub struct VideoArtifact {
    pub slides: Vec<Slide>,
    pub total_duration_secs: u32,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TextFallbackArtifact {
    /// `None` when the text could not be written to disk.
    pub path: Option<PathBuf>,
    /// Authoritative copy of the text.
    pub contents: String,
}

#[derive(Debug, Clone)]
pub enum MediaArtifact {
    Video(VideoArtifact),
    Text(TextFallbackArtifact),
}

impl MediaArtifact {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Video(video) => Some(&video.path),
            Self::Text(text) => text.path.as_deref(),
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video(_))
    }

    /// File name used when the artifact is archived.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Video(_) => VIDEO_FILE,
            Self::Text(_) => TEXT_FILE,
        }
    }
}

/// Cuts `text` to `max_chars` characters, appending "..." when it had to cut.
pub fn truncate_caption(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// Title slide followed by at most `MAX_BODY_SLIDES` paragraph slides.
pub fn plan_slides(story: &StoryArtifact, title: &str) -> Vec<SlidePlan> {
    let intro = SlidePlan {
        kind: SlideKind::Intro,
        caption: title.trim().to_string(),
        duration_secs: INTRO_SLIDE_SECS,
    };

    let body = story
        .body
        .iter()
        .filter(|p| !p.trim().is_empty())
        .take(MAX_BODY_SLIDES)
        .map(|paragraph| SlidePlan {
            kind: SlideKind::Body,
            caption: truncate_caption(paragraph, CAPTION_CHARS),
            duration_secs: BODY_SLIDE_SECS,
        });

    std::iter::once(intro).chain(body).collect()
}

/// Turns rendered frames into one encoded clip.
#[async_trait]
pub trait SlideEncoder: Send + Sync {
    async fn encode(&self, slides: &[Slide], fps: u32, workdir: &Path, output: &Path) -> Result<()>;
}

/// Encodes with the `ffmpeg` binary: one still clip per slide, then the
/// concat demuxer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegEncoder;

#[async_trait]
impl SlideEncoder for FfmpegEncoder {
    async fn encode(&self, slides: &[Slide], fps: u32, workdir: &Path, output: &Path) -> Result<()> {
        if !check_ffmpeg().await {
            bail!("ffmpeg not found in PATH");
        }

        let list_path = workdir.join("slides_concat_list.txt");
        let mut listf = fs::File::create(&list_path)
            .await
            .with_context(|| format!("Failed to create {}", list_path.display()))?;

        for (idx, slide) in slides.iter().enumerate() {
            let clip_name = format!("slide_{:02}.mp4", idx);
            let clip = workdir.join(&clip_name);
            if !ffmpeg::ffmpeg_still_clip(&slide.frame, slide.duration_secs, fps, &clip).await? {
                bail!("Failed to build slide clip {}", clip.display());
            }
            listf
                .write_all(format!("file '{}'\n", clip_name).as_bytes())
                .await?;
        }
        listf.flush().await?;

        if !ffmpeg::ffmpeg_concat_videos(&list_path, output).await? {
            bail!("Concat produced no output at {}", output.display());
        }

        match ffmpeg::ffprobe_duration_seconds(output).await {
            Ok(dur) => logok(format!("Encoded video: {:.2}s -> {}", dur, output.display())),
            Err(err) => logw(format!("Could not probe {}: {}", output.display(), err)),
        }
        Ok(())
    }
}

pub struct VideoAssembler {
    font: Arc<CaptionFont>,
    encoder: Box<dyn SlideEncoder>,
    frame_rate: u32,
}

impl VideoAssembler {
    pub fn new(font: Arc<CaptionFont>, encoder: impl SlideEncoder + 'static, frame_rate: u32) -> Self {
        Self {
            font,
            encoder: Box::new(encoder),
            frame_rate: frame_rate.max(1),
        }
    }

    pub fn set_encoder(&mut self, encoder: impl SlideEncoder + 'static) {
        self.encoder = Box::new(encoder);
    }

    pub async fn assemble(
        &self,
        story: &StoryArtifact,
        image: &ImageArtifact,
        title: &str,
        workdir: Option<&Path>,
    ) -> Generated<MediaArtifact> {
        let rendered = match workdir {
            Some(dir) => self.render_video(story, image, title, dir).await,
            None => Err(anyhow!("no request workspace to render into")),
        };
        let err = match rendered {
            Ok(video) => return Generated::primary(MediaArtifact::Video(video)),
            Err(err) => err,
        };

        logw(format!("Video assembly failed; falling back to story text: {err:#}"));
        let contents = text_fallback_contents(story, title);
        let mut reason = format!("{err:#}");
        let path = match workdir {
            Some(dir) => match save_text_fallback(dir, &contents).await {
                Ok(path) => Some(path),
                Err(write_err) => {
                    logw(format!("{write_err:#}"));
                    reason.push_str(&format!("; text copy not saved: {write_err:#}"));
                    None
                }
            },
            None => None,
        };

        Generated::degraded(
            MediaArtifact::Text(TextFallbackArtifact { path, contents }),
            StageError::AssemblyFailure(reason),
        )
    }

    async fn render_video(
        &self,
        story: &StoryArtifact,
        image: &ImageArtifact,
        title: &str,
        workdir: &Path,
    ) -> Result<VideoArtifact> {
        let plans = plan_slides(story, title);
        let frames_dir = workdir.join("frames");
        fs::create_dir_all(&frames_dir)
            .await
            .with_context(|| format!("Failed to create dir {}", frames_dir.display()))?;

        let mut slides = Vec::with_capacity(plans.len());
        for (idx, plan) in plans.into_iter().enumerate() {
            let frame = frames_dir.join(format!("frame_{:02}.png", idx));
            self.render_frame(&image.pixels, &plan)
                .save_with_format(&frame, ImageFormat::Png)
                .with_context(|| format!("Failed to write frame {}", frame.display()))?;
            slides.push(Slide {
                kind: plan.kind,
                caption: plan.caption,
                duration_secs: plan.duration_secs,
                frame,
            });
        }

        let output = workdir.join(VIDEO_FILE);
        logi(format!(
            "Encoding {} slides at {} fps -> {}",
            slides.len(),
            self.frame_rate,
            output.display()
        ));
        self.encoder
            .encode(&slides, self.frame_rate, workdir, &output)
            .await?;
        if !fs::try_exists(&output).await.unwrap_or(false) {
            bail!("encoder reported success but {} is missing", output.display());
        }

        let total_duration_secs = slides.iter().map(|s| s.duration_secs).sum();
        Ok(VideoArtifact {
            slides,
            total_duration_secs,
            path: output,
        })
    }

    /// The still image with the slide's caption composited over a darkened band.
    pub fn render_frame(&self, background: &RgbImage, plan: &SlidePlan) -> RgbImage {
        let mut frame = background.clone();
        let height = frame.height() as i32;

        let (size, wrap) = match plan.kind {
            SlideKind::Intro => (INTRO_SIZE, INTRO_WRAP),
            SlideKind::Body => (CAPTION_SIZE, CAPTION_WRAP),
        };
        let lines = wrap_words(&plan.caption, wrap);
        if lines.is_empty() {
            return frame;
        }

        let line_height = CaptionFont::line_height(size);
        let band_height = lines.len() as i32 * line_height + 2 * BAND_PADDING;
        let band_top = match plan.kind {
            SlideKind::Intro => (height - band_height) / 2,
            SlideKind::Body => height - CAPTION_BOTTOM_MARGIN - band_height,
        }
        .max(0);

        darken_band(&mut frame, band_top, band_top + band_height);
        let mut y = band_top + BAND_PADDING;
        for line in &lines {
            self.font.draw_centered(&mut frame, y, size, TEXT_COLOR, line);
            y += line_height;
        }
        frame
    }
}

fn darken_band(frame: &mut RgbImage, top: i32, bottom: i32) {
    let top = top.max(0) as u32;
    let bottom = (bottom.max(0) as u32).min(frame.height());
    for y in top..bottom {
        for x in 0..frame.width() {
            let pixel = frame.get_pixel_mut(x, y);
            pixel.0 = pixel.0.map(|c| (c as u16 * 2 / 5) as u8);
        }
    }
}

fn text_fallback_contents(story: &StoryArtifact, title: &str) -> String {
    format!("# {}\n\n{}", title.trim(), story.text)
}

async fn save_text_fallback(workdir: &Path, contents: &str) -> Result<PathBuf> {
    let path = workdir.join(TEXT_FILE);
    fs::write(&path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::provider::Source;
    use crate::request::ImageStyle;
    use std::sync::Mutex;

    /// Records what it was asked to encode and writes a placeholder file.
    #[derive(Default)]
    struct RecordingEncoder {
        seen: Arc<Mutex<Vec<(SlideKind, u32)>>>,
    }

    #[async_trait]
    impl SlideEncoder for RecordingEncoder {
        async fn encode(&self, slides: &[Slide], _fps: u32, _workdir: &Path, output: &Path) -> Result<()> {
            for slide in slides {
                assert!(slide.frame.exists());
                self.seen.lock().unwrap().push((slide.kind, slide.duration_secs));
            }
            fs::write(output, b"fake mp4").await?;
            Ok(())
        }
    }

    struct BrokenEncoder;

    #[async_trait]
    impl SlideEncoder for BrokenEncoder {
        async fn encode(&self, _: &[Slide], _: u32, _: &Path, _: &Path) -> Result<()> {
            bail!("encoder unavailable")
        }
    }

    fn story(paragraphs: usize) -> StoryArtifact {
        let body: Vec<String> = (1..=paragraphs).map(|i| format!("Paragraph number {i}.")).collect();
        StoryArtifact {
            title: "Tale".into(),
            intro: None,
            text: format!("# Tale\n\n{}", body.join("\n\n")),
            body,
            source: Source::Offline,
        }
    }

    fn image() -> ImageArtifact {
        ImageArtifact {
            pixels: RgbImage::from_pixel(64, 64, Rgb([200, 100, 50])),
            source: Source::Offline,
            style: ImageStyle::Oil,
        }
    }

    fn assembler(encoder: impl SlideEncoder + 'static) -> VideoAssembler {
        VideoAssembler::new(Arc::new(CaptionFont::bitmap()), encoder, 24)
    }

    #[test]
    fn caption_truncation_appends_ellipsis() {
        let long = "x".repeat(200);
        let cut = truncate_caption(&long, CAPTION_CHARS);
        assert_eq!(cut.chars().count(), CAPTION_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_caption("  short  ", CAPTION_CHARS), "short");
        assert_eq!(truncate_caption(&"y".repeat(150), 150), "y".repeat(150));
    }

    #[test]
    fn seven_paragraphs_yield_intro_and_five_slides() {
        let plans = plan_slides(&story(7), "Jungle Quest");
        assert_eq!(plans.len(), 1 + MAX_BODY_SLIDES);
        assert_eq!(plans[0].kind, SlideKind::Intro);
        assert_eq!(plans[0].caption, "Jungle Quest");
        assert_eq!(plans[0].duration_secs, INTRO_SLIDE_SECS);
        assert!(plans[1..].iter().all(|p| p.kind == SlideKind::Body && p.duration_secs == 5));
        assert_eq!(plans[5].caption, "Paragraph number 5.");
    }

    #[test]
    fn short_story_keeps_every_paragraph() {
        let plans = plan_slides(&story(3), "T");
        assert_eq!(plans.len(), 4);
    }

    #[test]
    fn frame_keeps_size_and_darkens_band() {
        let bg = RgbImage::from_pixel(1024, 1024, Rgb([200, 200, 200]));
        let plan = SlidePlan {
            kind: SlideKind::Body,
            caption: "A caption".into(),
            duration_secs: 5,
        };
        let frame = assembler(BrokenEncoder).render_frame(&bg, &plan);
        assert_eq!(frame.dimensions(), (1024, 1024));
        assert_eq!(*frame.get_pixel(0, 10), Rgb([200, 200, 200]));
        assert_eq!(*frame.get_pixel(2, 1024 - 61), Rgb([80, 80, 80]));
    }

    #[tokio::test]
    async fn assembles_video_with_bounded_slides() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = RecordingEncoder::default();
        let seen = encoder.seen.clone();

        let out = assembler(encoder)
            .assemble(&story(7), &image(), "Jungle Quest", Some(dir.path()))
            .await;
        assert!(!out.is_degraded());
        let MediaArtifact::Video(video) = out.artifact else {
            panic!("expected a video");
        };
        assert_eq!(video.slides.len(), 6);
        assert_eq!(video.total_duration_secs, 3 + 5 * 5);
        assert_eq!(video.path, dir.path().join("video.mp4"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], (SlideKind::Intro, 3));
        assert_eq!(seen.len(), 6);
    }

    #[tokio::test]
    async fn encoder_failure_falls_back_to_text() {
        let dir = tempfile::tempdir().unwrap();
        let tale = story(7);

        let out = assembler(BrokenEncoder)
            .assemble(&tale, &image(), "Jungle Quest", Some(dir.path()))
            .await;
        assert_eq!(out.fallback.as_ref().map(StageError::kind), Some(ErrorKind::AssemblyFailure));

        let media = out.artifact;
        assert!(!media.is_video());
        assert_eq!(media.file_name(), "story.txt");
        let path = media.path().expect("text fallback was saved");
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("txt"));

        let written = fs::read_to_string(path).await.unwrap();
        assert!(written.starts_with("# Jungle Quest\n\n# Tale"));
        // full story, not capped at five paragraphs
        assert!(written.contains("Paragraph number 7."));
    }

    #[tokio::test]
    async fn unwritable_workdir_keeps_text_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("occupied");
        std::fs::write(&not_a_dir, b"x").unwrap();

        let out = assembler(RecordingEncoder::default())
            .assemble(&story(3), &image(), "Jungle Quest", Some(&not_a_dir))
            .await;
        let reason = out.fallback.expect("assembly should degrade");
        assert_eq!(reason.kind(), ErrorKind::AssemblyFailure);
        assert!(reason.to_string().contains("text copy not saved"));

        let MediaArtifact::Text(text) = out.artifact else {
            panic!("expected the text fallback");
        };
        assert_eq!(text.path, None);
        assert!(text.contents.starts_with("# Jungle Quest\n\n# Tale"));
    }

    #[tokio::test]
    async fn missing_workdir_yields_unsaved_text() {
        let out = assembler(RecordingEncoder::default())
            .assemble(&story(2), &image(), "Jungle Quest", None)
            .await;
        assert_eq!(out.fallback.map(|e| e.kind()), Some(ErrorKind::AssemblyFailure));
        assert!(!out.artifact.is_video());
        assert_eq!(out.artifact.path(), None);
    }
}
