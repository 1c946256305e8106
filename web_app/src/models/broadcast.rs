use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Debug, Display, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BroadcastKind {
    #[display("news")]
    News,
    #[display("text")]
    Text,
    #[display("voice")]
    Voice,
    #[display("image")]
    Image,
}

/// Delivery phase as reported by the platform.
#[derive(Debug, Display, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPhase {
    // Platform accepted the job and is still delivering
    #[default]
    #[display("sending")]
    Sending,
    #[display("sent")]
    Sent,
    // Finished, but some recipients could not be reached
    #[display("partial_failure")]
    PartialFailure,
    #[display("failed")]
    Failed,
}

/// One article as written by the operator, before dispatch.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ArticleDraft {
    pub title: String,
    pub body: String,
    /// Handle of the cover image (a `thumb` media asset)
    #[serde(default)]
    pub media_ref: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// An article that belongs to a dispatched broadcast. `index` never changes,
/// even when earlier articles are retracted.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Article {
    pub index: u32,
    pub title: String,
    pub body: String,
    pub media_ref: Option<String>,
}

/// What the operator wants to send, one variant per broadcast kind.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", content = "content", rename_all = "lowercase")]
pub enum BroadcastRequest {
    News(Vec<ArticleDraft>),
    Text(String),
    /// Handle of an uploaded voice asset
    Voice(String),
    /// Handle of an uploaded image asset
    Image(String),
}

impl BroadcastRequest {
    pub fn kind(&self) -> BroadcastKind {
        match self {
            BroadcastRequest::News(_) => BroadcastKind::News,
            BroadcastRequest::Text(_) => BroadcastKind::Text,
            BroadcastRequest::Voice(_) => BroadcastKind::Voice,
            BroadcastRequest::Image(_) => BroadcastKind::Image,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Broadcast {
    pub id: i64,
    pub kind: BroadcastKind,
    pub articles: Vec<Article>,
    pub status: DeliveryPhase,
    pub created_at: DateTime<Utc>,
}

impl Broadcast {
    /// Builds the record of a broadcast the platform just accepted under `id`.
    pub fn dispatched(id: i64, request: &BroadcastRequest) -> Self {
        let articles = match request {
            BroadcastRequest::News(drafts) => drafts
                .iter()
                .zip(0u32..)
                .map(|(draft, index)| Article {
                    index,
                    title: draft.title.clone(),
                    body: draft.body.clone(),
                    media_ref: draft.media_ref.clone(),
                })
                .collect(),
            _ => Vec::new(),
        };

        Self {
            id,
            kind: request.kind(),
            articles,
            status: DeliveryPhase::Sending,
            created_at: Utc::now(),
        }
    }
}

/// Last known local record of a broadcast.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoredBroadcast {
    /// Articles still live on the platform (retracted ones are left out)
    pub broadcast: Broadcast,
    /// Number of articles at dispatch time
    pub dispatched_articles: u32,
}

impl StoredBroadcast {
    pub fn had_article(&self, index: u32) -> bool {
        index < self.dispatched_articles
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DeliveryStatus {
    pub broadcast_id: i64,
    pub phase: DeliveryPhase,
    pub total_recipients: u64,
    pub succeeded: u64,
    pub failed: u64,
}
