use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Timing knobs the playback controller runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    pub poll_interval: Duration,
    pub end_tolerance: f64,
    pub settle_timeout: Duration,
    pub placeholder_duration: f64,
    pub initial_rate: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        AppConfig::default().playback()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub poll_interval_ms: u64,
    pub end_tolerance_secs: f64,
    pub settle_timeout_ms: u64,
    pub placeholder_duration_secs: f64,
    pub default_playback_rate: f64,
    pub permitted_rates: Vec<f64>,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    #[serde(default = "default_max_tool_processes")]
    pub max_tool_processes: usize,
    #[serde(default)]
    pub last_directory: Option<PathBuf>,
}

fn default_max_tool_processes() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 200,
            end_tolerance_secs: 0.3,
            settle_timeout_ms: 300,
            placeholder_duration_secs: 60.0,
            default_playback_rate: 1.0,
            permitted_rates: vec![0.5, 1.0, 2.0, 5.0],
            ffmpeg_path: None,
            ffprobe_path: None,
            max_tool_processes: default_max_tool_processes(),
            last_directory: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file at {}: {}", config_path.display(), e))?;

            match serde_json::from_str::<Self>(&content) {
                Ok(config) => {
                    log::info!("Loaded existing config from {}", config_path.display());
                    Ok(config.sanitized())
                }
                Err(e) => {
                    log::warn!("Config file exists but has issues ({}), creating new one with defaults", e);
                    let new_config = Self::default();
                    new_config.save()
                        .map_err(|save_err| anyhow::anyhow!("Failed to save new config: {}", save_err))?;
                    log::info!("Created new config file at {}", config_path.display());
                    Ok(new_config)
                }
            }
        } else {
            log::info!("No config file found, creating default config");
            let config = Self::default();
            config.save()
                .map_err(|e| anyhow::anyhow!("Failed to save default config: {}", e))?;
            log::info!("Created new config file at {}", config_path.display());
            Ok(config)
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dashcam-viewer")
            .join("config.json")
    }

    /// Replaces values the controller cannot run with by their defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        if self.poll_interval_ms == 0 {
            log::warn!("poll_interval_ms must be positive, using {}", defaults.poll_interval_ms);
            self.poll_interval_ms = defaults.poll_interval_ms;
        }
        if !self.end_tolerance_secs.is_finite() || self.end_tolerance_secs < 0.0 {
            log::warn!("end_tolerance_secs is invalid, using {}", defaults.end_tolerance_secs);
            self.end_tolerance_secs = defaults.end_tolerance_secs;
        }
        if !self.placeholder_duration_secs.is_finite() || self.placeholder_duration_secs <= 0.0 {
            self.placeholder_duration_secs = defaults.placeholder_duration_secs;
        }
        self.permitted_rates.retain(|rate| rate.is_finite() && *rate > 0.0);
        if self.permitted_rates.is_empty() {
            self.permitted_rates = defaults.permitted_rates.clone();
        }
        if !self.permitted_rates.contains(&self.default_playback_rate) {
            log::warn!(
                "default_playback_rate {} is not a permitted rate, using {}",
                self.default_playback_rate,
                defaults.default_playback_rate
            );
            self.default_playback_rate = defaults.default_playback_rate;
        }
        if self.max_tool_processes == 0 {
            self.max_tool_processes = defaults.max_tool_processes;
        }
        self
    }

    pub fn playback(&self) -> PlaybackSettings {
        PlaybackSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            end_tolerance: self.end_tolerance_secs,
            settle_timeout: Duration::from_millis(self.settle_timeout_ms),
            placeholder_duration: self.placeholder_duration_secs,
            initial_rate: self.default_playback_rate,
        }
    }

    pub fn ffmpeg_command(&self) -> PathBuf {
        self.ffmpeg_path.clone().unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }

    pub fn ffprobe_command(&self) -> PathBuf {
        self.ffprobe_path.clone().unwrap_or_else(|| PathBuf::from("ffprobe"))
    }
}
