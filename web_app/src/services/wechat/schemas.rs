//! # WeChat API Schemas
//!
//! Payloads exchanged with the official account API. Every response may carry
//! `errcode`/`errmsg`; a non-zero `errcode` means the call was refused.

use serde::{Deserialize, Serialize};

use crate::models::broadcast::ArticleDraft;

/// Status fields present on platform responses
#[derive(Debug, Default, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

/// Response of the credential endpoint
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IssuedToken {
    pub access_token: String,
    /// Validity window in seconds
    pub expires_in: i64,
}

/// Response of the media and article bundle upload endpoints
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UploadedMedia {
    #[serde(rename = "type")]
    pub media_type: String,
    /// Thumb uploads answer with `thumb_media_id` instead
    #[serde(alias = "thumb_media_id")]
    pub media_id: String,
    #[serde(default)]
    pub created_at: i64,
}

/// Response of the article image upload endpoint
#[derive(Debug, Deserialize)]
pub struct UploadedImage {
    pub url: String,
}

/// One article of an article bundle
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewsArticle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_media_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_source_url: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub show_cover_pic: u8,
}

impl From<&ArticleDraft> for NewsArticle {
    fn from(draft: &ArticleDraft) -> Self {
        Self {
            thumb_media_id: draft.media_ref.clone(),
            author: draft.author.clone(),
            title: draft.title.clone(),
            content_source_url: draft.source_url.clone(),
            content: draft.body.clone(),
            digest: draft.digest.clone(),
            show_cover_pic: u8::from(draft.media_ref.is_some()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewsUploadRequest<'a> {
    pub articles: &'a [NewsArticle],
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MediaRef {
    pub media_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextContent {
    pub content: String,
}

/// Body of a mass message, tagged by `msgtype`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "msgtype", rename_all = "lowercase")]
pub enum MassMessage {
    Mpnews { mpnews: MediaRef },
    Text { text: TextContent },
    Voice { voice: MediaRef },
    Image { image: MediaRef },
}

impl MassMessage {
    pub fn news(bundle_id: String) -> Self {
        MassMessage::Mpnews {
            mpnews: MediaRef { media_id: bundle_id },
        }
    }

    pub fn text(content: String) -> Self {
        MassMessage::Text {
            text: TextContent { content },
        }
    }

    pub fn voice(media_id: String) -> Self {
        MassMessage::Voice {
            voice: MediaRef { media_id },
        }
    }

    pub fn image(media_id: String) -> Self {
        MassMessage::Image {
            image: MediaRef { media_id },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MassFilter {
    pub is_to_all: bool,
}

/// Mass message addressed to every subscriber
#[derive(Debug, Serialize)]
pub struct SendAllRequest<'a> {
    pub filter: MassFilter,
    #[serde(flatten)]
    pub message: &'a MassMessage,
    /// 0: stop the job when the platform flags an article as a reprint
    pub send_ignore_reprint: u8,
}

impl<'a> SendAllRequest<'a> {
    pub fn to_all(message: &'a MassMessage) -> Self {
        Self {
            filter: MassFilter { is_to_all: true },
            message,
            send_ignore_reprint: 0,
        }
    }
}

/// Mass message sent to a single subscriber for review
#[derive(Debug, Serialize)]
pub struct PreviewRequest<'a> {
    pub touser: &'a str,
    #[serde(flatten)]
    pub message: &'a MassMessage,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MassSendReceipt {
    pub msg_id: i64,
    #[serde(default)]
    pub msg_data_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MassStatusRequest {
    pub msg_id: String,
}

/// Delivery report of a mass message
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MassStatus {
    pub msg_id: i64,
    /// `SENDING`, `SEND_SUCCESS`, `SEND_FAIL` or `DELETE`
    pub msg_status: String,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub sent_count: u64,
    #[serde(default)]
    pub error_count: u64,
}

#[derive(Debug, Serialize)]
pub struct MassDeleteRequest {
    pub msg_id: i64,
    pub article_idx: u32,
}
