use ai_story_shorts::init::check_ffmpeg;
use ai_story_shorts::video::MediaArtifact;
use ai_story_shorts::{Config, GenerationRequest, ImageStyle, NarrativeStyle, Pipeline, StoryLength};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Generate a short illustrated story video, falling back to offline
/// generators whenever a provider is not configured or not reachable.
#[derive(Debug, Parser)]
#[command(name = "ai-story-shorts", version, about)]
struct Args {
    /// What the story is about
    #[arg(long)]
    topic: String,

    /// Narrative style (Adventure, Fantasy, Sci-Fi, Drama, Comedy, Horror, Educational)
    #[arg(long, default_value = "Adventure")]
    style: NarrativeStyle,

    /// Story length (Short, Medium, Long)
    #[arg(long, default_value = "Medium")]
    length: StoryLength,

    /// Scene to illustrate
    #[arg(long)]
    image_description: String,

    /// Illustration style; unknown styles get a neutral background
    #[arg(long, default_value = "Realistic")]
    image_style: ImageStyle,

    /// Video title, also used for the archive commit message
    #[arg(long)]
    title: String,

    /// JSON config file; environment variables override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if !check_ffmpeg().await {
        eprintln!("[WARNING] FFmpeg not found in PATH. The story will be saved as text instead of video.");
    }

    let cfg = match &args.config {
        Some(path) => Config::load(path).await?.with_env_overrides(),
        None => Config::from_env(),
    };

    let request = GenerationRequest {
        topic: args.topic,
        narrative_style: args.style,
        length: args.length,
        image_description: args.image_description,
        image_style: args.image_style,
        video_title: args.title,
    };

    let pipeline = Pipeline::from_config(&cfg)?;
    let result = pipeline.run(&request).await;

    println!("Story:     {} ({} paragraphs)", result.story.source, result.story.body.len());
    match &result.image_path {
        Some(path) => println!("Image:     {} ({})", path.display(), result.image.source),
        None => println!("Image:     not saved ({})", result.image.source),
    }
    let kind = if result.media.is_video() { "video" } else { "text" };
    match result.media.path() {
        Some(path) => println!("Media:     {} {}", kind, path.display()),
        None => println!("Media:     {} (not saved)\n\n{}", kind, fallback_text(&result.media)),
    }
    match &result.archive_folder {
        Some(folder) => println!("Archive:   {}", folder),
        None => println!("Archive:   skipped"),
    }
    for reason in &result.degradations {
        println!("Fallback:  [{}] {}", reason.kind(), reason);
    }
    match &result.workspace {
        Some(dir) => println!("Workspace: {}", dir.display()),
        None => println!("Workspace: none"),
    }
    Ok(())
}

fn fallback_text(media: &MediaArtifact) -> &str {
    match media {
        MediaArtifact::Text(text) => &text.contents,
        MediaArtifact::Video(_) => "",
    }
}
