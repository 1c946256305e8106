use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::errors::ValidationError;

#[derive(Debug, Display, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[display("image")]
    Image,
    #[display("voice")]
    Voice,
    #[display("video")]
    Video,
    #[display("thumb")]
    Thumb,
    /// Article bundle. Produced by bundle uploads only, never uploaded as a file.
    #[display("news")]
    News,
}

impl MediaKind {
    /// Value of the `type` parameter expected by the upload endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Voice => "voice",
            MediaKind::Video => "video",
            MediaKind::Thumb => "thumb",
            MediaKind::News => "news",
        }
    }
}

impl FromStr for MediaKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "voice" => Ok(MediaKind::Voice),
            "video" => Ok(MediaKind::Video),
            "thumb" => Ok(MediaKind::Thumb),
            other => Err(ValidationError::UnsupportedMediaKind(other.to_string())),
        }
    }
}

/// Opaque handle to an asset held by the platform.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MediaAsset {
    pub handle: String,
    pub media_kind: MediaKind,
    pub created_at: DateTime<Utc>,
}
