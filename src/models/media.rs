use anyhow::{Error, Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = filename.rsplit_once('.')?.1.to_ascii_lowercase();

        match extension.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" => Some(MediaKind::Image),
            "mp4" | "avi" | "mov" | "wmv" | "flv" | "webm" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MediaLimits {
    pub max_image_bytes: u64,
    pub max_video_bytes: u64,
}

impl MediaLimits {
    pub fn max_bytes(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Image => self.max_image_bytes,
            MediaKind::Video => self.max_video_bytes,
        }
    }
}

/// Media attachment ready for the gateway: base64 data without any data-URL
/// prefix, plus the kind the gateway endpoint expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPayload {
    pub filename: String,
    pub kind: MediaKind,
    pub data: String,
}

impl MediaPayload {
    /// Builds a payload from raw file bytes, enforcing the per-kind size cap.
    pub fn from_bytes(filename: &str, bytes: &[u8], limits: &MediaLimits) -> Result<Self, Error> {
        let kind = MediaKind::from_filename(filename)
            .ok_or_else(|| anyhow!("Unsupported media type for file '{}'", filename))?;

        let max_bytes = limits.max_bytes(kind);
        if bytes.len() as u64 > max_bytes {
            return Err(anyhow!(
                "File '{}' too large. Maximum size: {}MB",
                filename,
                max_bytes / (1024 * 1024)
            ));
        }

        Ok(Self {
            filename: filename.to_string(),
            kind,
            data: STANDARD.encode(bytes),
        })
    }

    /// Builds a payload from base64 input, stripping a `data:...;base64,`
    /// prefix if the caller included one. The data is decoded once to verify
    /// it is valid base64 and within the size cap.
    pub fn from_base64(filename: &str, data: &str, limits: &MediaLimits) -> Result<Self, Error> {
        let cleaned = match data.strip_prefix("data:") {
            Some(rest) => rest.split_once(',').map(|(_, b64)| b64).unwrap_or(data),
            None => data,
        };

        let bytes = STANDARD
            .decode(cleaned)
            .map_err(|_| anyhow!("File '{}' is not valid base64 data", filename))?;

        let mut payload = Self::from_bytes(filename, &bytes, limits)?;
        payload.data = cleaned.to_string();
        Ok(payload)
    }
}
