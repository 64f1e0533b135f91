use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Video container extensions a clip file may carry (compared case-insensitively).
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "mkv", "m4v", "webm"];

/// Length of `YYYY-MM-DD_HH-MM-SS`.
const TIMESTAMP_LEN: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraAngle {
    Front,
    Back,
    LeftPillar,
    RightPillar,
    LeftRepeater,
    RightRepeater,
}

impl CameraAngle {
    pub const ALL: [CameraAngle; 6] = [
        CameraAngle::Front,
        CameraAngle::Back,
        CameraAngle::LeftPillar,
        CameraAngle::RightPillar,
        CameraAngle::LeftRepeater,
        CameraAngle::RightRepeater,
    ];

    /// Display grid, two rows of three, front and back in the middle column.
    pub const LAYOUT: [[CameraAngle; 3]; 2] = [
        [CameraAngle::LeftPillar, CameraAngle::Front, CameraAngle::RightPillar],
        [CameraAngle::RightRepeater, CameraAngle::Back, CameraAngle::LeftRepeater],
    ];

    /// The literal used in clip file names.
    pub fn as_str(self) -> &'static str {
        match self {
            CameraAngle::Front => "front",
            CameraAngle::Back => "back",
            CameraAngle::LeftPillar => "left_pillar",
            CameraAngle::RightPillar => "right_pillar",
            CameraAngle::LeftRepeater => "left_repeater",
            CameraAngle::RightRepeater => "right_repeater",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CameraAngle::Front => "front",
            CameraAngle::Back => "back",
            CameraAngle::LeftPillar => "left pillar",
            CameraAngle::RightPillar => "right pillar",
            CameraAngle::LeftRepeater => "left repeater",
            CameraAngle::RightRepeater => "right repeater",
        }
    }

    /// Unknown literals are not angles; there is no error case.
    pub fn from_literal(literal: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|angle| angle.as_str() == literal)
    }
}

impl fmt::Display for CameraAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch identifier taken verbatim from a clip name, e.g. `2024-01-01_10-00-00`.
///
/// Every digit field is zero padded and fixed width, so comparing the strings
/// orders keys chronologically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimestampKey(String);

impl TimestampKey {
    /// Accepts exactly `\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != TIMESTAMP_LEN {
            return None;
        }
        let well_formed = raw.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 | 13 | 16 => b == b'-',
            10 => b == b'_',
            _ => b.is_ascii_digit(),
        });
        well_formed.then(|| TimestampKey(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `2024-01-01 10:00:00`
    pub fn display_label(&self) -> String {
        let (date, time) = self.0.split_at(10);
        format!("{} {}", date, time[1..].replace('-', ":"))
    }

    /// `None` for keys that are well formed but not a real calendar time (month 13 and so on).
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.0, "%Y-%m-%d_%H-%M-%S").ok()
    }
}

impl fmt::Display for TimestampKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One recognized clip file: the recording event it belongs to and the camera that shot it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRef {
    pub key: TimestampKey,
    pub angle: CameraAngle,
    pub file: PathBuf,
}

impl ClipRef {
    pub fn file_name(&self) -> &str {
        self.file
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }
}

/// Splits `<timestamp>-<angle>.<video-ext>` into its key and angle.
///
/// Returns `None` for anything else (metadata files, thumbnails, stray
/// notes); such files are skipped, never reported as errors.
pub fn parse_clip_name(name: &str) -> Option<(TimestampKey, CameraAngle)> {
    let (stem, extension) = name.rsplit_once('.')?;
    if !VIDEO_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
    {
        return None;
    }

    let timestamp = stem.get(..TIMESTAMP_LEN)?;
    let angle = stem.get(TIMESTAMP_LEN..)?.strip_prefix('-')?;

    Some((TimestampKey::parse(timestamp)?, CameraAngle::from_literal(angle)?))
}
