//! Media asset uploads.
//!
//! Content is checked locally before anything is sent; the platform then
//! answers with an opaque handle that later broadcasts refer to.

use chrono::{DateTime, Utc};

use super::{
    Platform,
    errors::{UploadError, ValidationError},
};
use crate::{
    metric,
    models::media::{MediaAsset, MediaKind},
    services::wechat::schemas::UploadedMedia,
};

fn validate_content(content: &[u8]) -> Result<(), ValidationError> {
    if content.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok(())
}

/// Builds the asset from an upload answer. The platform reports its own
/// creation time; when it does not, the local clock is used.
pub(super) fn asset_from(uploaded: UploadedMedia, media_kind: MediaKind) -> MediaAsset {
    let created_at = DateTime::<Utc>::from_timestamp(uploaded.created_at, 0)
        .filter(|_| uploaded.created_at > 0)
        .unwrap_or_else(Utc::now);

    MediaAsset {
        handle: uploaded.media_id,
        media_kind,
        created_at,
    }
}

/// Uploads one media asset and returns its platform handle.
pub async fn upload(
    platform: &Platform,
    media_kind: MediaKind,
    content: &[u8],
    filename: &str,
) -> Result<MediaAsset, UploadError> {
    let _span = logfire::span!("upload_media").entered();

    validate_content(content)?;

    let api = &platform.api;
    let result = platform
        .with_token::<_, UploadError, _, _>(|token| async move {
            api.upload_media(&token.value, media_kind, content, filename)
                .await
        })
        .await;

    match result {
        Ok(uploaded) => {
            metric::incr_media_upload_statds(media_kind.as_str());
            Ok(asset_from(uploaded, media_kind))
        }
        Err(err) => {
            logfire::warn!("media upload failed: {error}", error = err.to_string());
            metric::incr_media_upload_statds("failed");
            Err(err)
        }
    }
}

/// Uploads an image meant to be embedded inside article bodies and returns
/// the URL the platform serves it from.
pub async fn upload_article_image(
    platform: &Platform,
    content: &[u8],
    filename: &str,
) -> Result<String, UploadError> {
    let _span = logfire::span!("upload_article_image").entered();

    validate_content(content)?;

    let api = &platform.api;
    platform
        .with_token::<_, UploadError, _, _>(|token| async move {
            api.upload_news_image(&token.value, content, filename).await
        })
        .await
}
