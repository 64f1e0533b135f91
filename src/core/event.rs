use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::core::error::{Result, ViewerError};

/// Recorders write coordinates and the camera index either quoted or as bare numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(text)) => Ok(Some(text)),
        Some(serde_json::Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

/// Contents of the `event.json` a recorder writes next to a saved event.
///
/// Every field is optional; recorders differ in what they fill in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub est_lat: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub est_lon: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub camera: Option<String>,
}

impl EventMetadata {
    pub fn from_json(path: &Path, content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|source| ViewerError::MetadataParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ViewerError::MetadataRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &content)
    }

    /// Loads the first readable metadata file, logging and skipping broken ones.
    pub fn load_first(paths: &[impl AsRef<Path>]) -> Option<Self> {
        for path in paths {
            match Self::load(path.as_ref()) {
                Ok(metadata) => {
                    log::info!("Loaded event metadata from {}", path.as_ref().display());
                    return Some(metadata);
                }
                Err(e) => log::warn!("{}", e),
            }
        }
        None
    }

    /// Local time for the recorded timestamp (ISO 8601, with or without offset).
    pub fn local_time(&self) -> Option<DateTime<Local>> {
        let raw = self.timestamp.as_deref()?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Local));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .and_then(|naive| naive.and_local_timezone(Local).single())
    }

    pub fn time_label(&self) -> Option<String> {
        match self.local_time() {
            Some(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => self.timestamp.clone(),
        }
    }

    pub fn location_label(&self) -> Option<String> {
        let coordinates = match (&self.est_lat, &self.est_lon) {
            (Some(lat), Some(lon)) => Some(format!("({}, {})", lat, lon)),
            _ => None,
        };
        match (&self.city, coordinates) {
            (Some(city), Some(coords)) => Some(format!("{} {}", city, coords)),
            (Some(city), None) => Some(city.clone()),
            (None, coords) => coords,
        }
    }
}
