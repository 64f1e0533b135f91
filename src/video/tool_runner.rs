use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::core::AppConfig;
use crate::video::thumbnail::{rgb_to_rgba, Thumbnail};

#[derive(Debug, Error)]
pub enum ToolError {
    /// The executable could not be started at all (not installed, not on PATH).
    #[error("{tool} is not available: {source}")]
    Unavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed: {message}")]
    Failed { tool: String, message: String },
}

/// Runs ffprobe and ffmpeg for the media worker.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    active_count: Arc<AtomicUsize>,
}

impl ToolRunner {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_command(),
            ffprobe: config.ffprobe_command(),
            active_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Container duration in seconds.
    pub fn probe_duration(&self, file_path: &Path) -> Result<f64, ToolError> {
        let mut cmd = Command::new(&self.ffprobe);
        cmd.arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg(file_path);

        let output = self.execute(cmd, "ffprobe")?;
        let json_str = String::from_utf8_lossy(&output.stdout);
        parse_probe_duration(&json_str).map_err(|message| ToolError::Failed {
            tool: "ffprobe".to_string(),
            message: format!("{}: {}", file_path.display(), message),
        })
    }

    /// First frame of `file_path`, scaled to `width`×`height`.
    pub fn extract_first_frame(&self, file_path: &Path, width: u32, height: u32) -> Result<Thumbnail, ToolError> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-ss").arg("0")
            .arg("-i").arg(file_path)
            .arg("-vframes").arg("1")
            .arg("-f").arg("rawvideo")
            .arg("-pix_fmt").arg("rgb24")
            .arg("-s").arg(format!("{}x{}", width, height))
            .arg("-loglevel").arg("quiet")
            .arg("-nostdin")
            .arg("-");

        let output = self.execute(cmd, "ffmpeg")?;
        let expected_size = (width * height * 3) as usize;
        if output.stdout.len() != expected_size {
            return Err(ToolError::Failed {
                tool: "ffmpeg".to_string(),
                message: format!(
                    "Unexpected frame size for {}: {} (expected {})",
                    file_path.display(),
                    output.stdout.len(),
                    expected_size
                ),
            });
        }

        Ok(Thumbnail {
            rgba: rgb_to_rgba(&output.stdout),
            width,
            height,
        })
    }

    pub fn active_count(&self) -> usize {
        self.active_count.load(Ordering::SeqCst)
    }

    fn execute(&self, mut command: Command, tool: &str) -> Result<Output, ToolError> {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        log::debug!("Executing {}, active count: {}", tool, self.active_count());

        let result = command.output();

        self.active_count.fetch_sub(1, Ordering::SeqCst);

        let output = result.map_err(|source| ToolError::Unavailable {
            tool: tool.to_string(),
            source,
        })?;
        if !output.status.success() {
            return Err(ToolError::Failed {
                tool: tool.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

/// Reads `format.duration` out of `ffprobe -print_format json -show_format` output.
pub fn parse_probe_duration(json: &str) -> Result<f64, String> {
    let info: serde_json::Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let duration = info["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| "no duration reported".to_string())?;

    if duration.is_finite() && duration > 0.0 {
        Ok(duration)
    } else {
        Err(format!("unusable duration {}", duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_duration() {
        let json = r#"{
            "format": {
                "filename": "2024-01-01_10-00-00-front.mp4",
                "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                "duration": "60.033333",
                "size": "38011235"
            }
        }"#;
        assert_eq!(parse_probe_duration(json), Ok(60.033333));
    }

    #[test]
    fn test_parse_probe_duration_rejects_missing_or_bad_values() {
        assert!(parse_probe_duration(r#"{"format": {}}"#).is_err());
        assert!(parse_probe_duration(r#"{"format": {"duration": "N/A"}}"#).is_err());
        assert!(parse_probe_duration(r#"{"format": {"duration": "0.000000"}}"#).is_err());
        assert!(parse_probe_duration("").is_err());
    }

    #[test]
    fn test_missing_executable_is_unavailable() {
        let mut config = AppConfig::default();
        config.ffprobe_path = Some(PathBuf::from("/nonexistent/dashcam-viewer/ffprobe"));
        let runner = ToolRunner::new(&config);

        let result = runner.probe_duration(Path::new("/nonexistent/clip.mp4"));
        assert!(matches!(result, Err(ToolError::Unavailable { .. })));
        assert_eq!(runner.active_count(), 0);
    }
}
