use crate::logw;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }
    cmd.kill_on_drop(true);

    let status = tokio::time::timeout(COMMAND_TIMEOUT, cmd.status())
        .await
        .map_err(|_| anyhow::anyhow!("Command timed out after {:?}: {:?}", COMMAND_TIMEOUT, args))?
        .context("Command execution failed")?;
    if !status.success() {
        return Err(anyhow::anyhow!("Command failed: {:?}", args));
    }

    Ok(())
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed"));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.1 {
        return Err(anyhow::anyhow!("Invalid duration"));
    }
    Ok(duration)
}

/// Arguments that turn one still frame into a silent clip.
pub fn still_clip_args(frame_png: &Path, duration_s: u32, fps: u32, out_mp4: &Path) -> Vec<String> {
    vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-framerate".to_string(),
        fps.to_string(),
        "-t".to_string(),
        duration_s.to_string(),
        "-i".to_string(),
        frame_png.display().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "22".to_string(),
        "-r".to_string(),
        fps.to_string(),
        "-an".to_string(),
        out_mp4.display().to_string(),
    ]
}

pub async fn ffmpeg_still_clip(
    frame_png: &Path,
    duration_s: u32,
    fps: u32,
    out_mp4: &Path,
) -> Result<bool> {
    if duration_s == 0 || fps == 0 {
        logw(format!("Refusing empty clip for {}", frame_png.display()));
        return Ok(false);
    }
    run_cmd(&still_clip_args(frame_png, duration_s, fps, out_mp4)).await?;
    Ok(out_mp4.exists())
}

pub async fn ffmpeg_concat_videos(list_txt: &Path, out_mp4: &Path) -> Result<bool> {
    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_txt.display().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "22".to_string(),
        "-an".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        out_mp4.display().to_string(),
    ];
    run_cmd(&args).await?;
    Ok(out_mp4.exists())
}
