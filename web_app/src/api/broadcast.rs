//! # Broadcast Composer & Dispatcher
//!
//! Turns an operator [`BroadcastRequest`] into one platform mass message.
//! Requests are validated completely before any network call. News articles
//! are bundled first (one upload, accepted or rejected as a whole) and the
//! bundle handle is what the mass message refers to, so a news broadcast is
//! either sent with all its articles or not sent at all.

use super::{
    Platform,
    errors::{DispatchError, ValidationError},
    media,
};
use crate::{
    metric,
    models::{
        broadcast::{ArticleDraft, Broadcast, BroadcastRequest},
        media::{MediaAsset, MediaKind},
    },
    repo,
    services::wechat::schemas::{MassMessage, NewsArticle},
};

fn validate_articles(drafts: &[ArticleDraft]) -> Result<(), ValidationError> {
    if drafts.is_empty() {
        return Err(ValidationError::NoArticles);
    }

    for (index, draft) in drafts.iter().enumerate() {
        if draft.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle { index });
        }
        if draft
            .media_ref
            .as_deref()
            .is_some_and(|media_ref| media_ref.trim().is_empty())
        {
            return Err(ValidationError::EmptyMediaRef { index });
        }
    }

    Ok(())
}

/// Checks a request without touching the network.
pub fn validate(request: &BroadcastRequest) -> Result<(), ValidationError> {
    match request {
        BroadcastRequest::News(drafts) => validate_articles(drafts),
        BroadcastRequest::Text(body) if body.trim().is_empty() => Err(ValidationError::EmptyText),
        BroadcastRequest::Voice(handle) | BroadcastRequest::Image(handle)
            if handle.trim().is_empty() =>
        {
            Err(ValidationError::EmptyMediaHandle)
        }
        BroadcastRequest::Text(_) | BroadcastRequest::Voice(_) | BroadcastRequest::Image(_) => {
            Ok(())
        }
    }
}

/// Uploads the articles as one platform bundle. Nothing is uploaded when any
/// article is invalid.
pub async fn upload_article_bundle(
    platform: &Platform,
    drafts: &[ArticleDraft],
) -> Result<MediaAsset, DispatchError> {
    validate_articles(drafts)?;

    let articles = drafts.iter().map(NewsArticle::from).collect::<Vec<_>>();
    let api = &platform.api;
    let articles = articles.as_slice();
    let uploaded = platform
        .with_token::<_, DispatchError, _, _>(|token| async move {
            api.upload_news(&token.value, articles).await
        })
        .await?;

    Ok(media::asset_from(uploaded, MediaKind::News))
}

/// Builds the mass message body for an already validated request.
async fn compose(
    platform: &Platform,
    request: &BroadcastRequest,
) -> Result<MassMessage, DispatchError> {
    let message = match request {
        BroadcastRequest::News(drafts) => {
            let bundle = upload_article_bundle(platform, drafts).await?;
            MassMessage::news(bundle.handle)
        }
        BroadcastRequest::Text(body) => MassMessage::text(body.clone()),
        BroadcastRequest::Voice(handle) => MassMessage::voice(handle.clone()),
        BroadcastRequest::Image(handle) => MassMessage::image(handle.clone()),
    };

    Ok(message)
}

/// Sends a broadcast to every subscriber.
///
/// The accepted broadcast is recorded through `repo`; a failure to record it
/// is logged and does not fail the dispatch, since the platform already
/// accepted the job.
pub async fn dispatch(
    platform: &Platform,
    repo: &repo::ImplAppRepo,
    request: &BroadcastRequest,
) -> Result<Broadcast, DispatchError> {
    let _span = logfire::span!(
        "dispatch {kind} broadcast",
        kind = request.kind().to_string()
    )
    .entered();

    validate(request)?;

    let message = compose(platform, request).await?;
    let api = &platform.api;
    let message = &message;
    let receipt = match platform
        .with_token::<_, DispatchError, _, _>(|token| async move {
            api.send_all(&token.value, message).await
        })
        .await
    {
        Ok(receipt) => receipt,
        Err(err) => {
            logfire::warn!("broadcast dispatch failed: {error}", error = err.to_string());
            metric::incr_broadcast_statds("failed");
            return Err(err);
        }
    };

    let broadcast = Broadcast::dispatched(receipt.msg_id, request);
    logfire::info!("broadcast {id} accepted by platform", id = broadcast.id);
    metric::incr_broadcast_statds(&broadcast.kind.to_string());

    if let Err(e) = repo.save_broadcast(&broadcast).await {
        logfire::error!(
            "failed to record broadcast {id}: {error}",
            id = broadcast.id,
            error = e.to_string()
        );
    }

    Ok(broadcast)
}

/// Sends the same body a broadcast would carry to a single subscriber so the
/// operator can review it. Nothing is recorded.
pub async fn preview(
    platform: &Platform,
    request: &BroadcastRequest,
    to_user: &str,
) -> Result<(), DispatchError> {
    let _span = logfire::span!(
        "preview {kind} broadcast",
        kind = request.kind().to_string()
    )
    .entered();

    if to_user.trim().is_empty() {
        return Err(ValidationError::EmptyRecipient.into());
    }
    validate(request)?;

    let message = compose(platform, request).await?;
    let api = &platform.api;
    let message = &message;
    platform
        .with_token::<_, DispatchError, _, _>(|token| async move {
            api.preview(&token.value, to_user, message).await
        })
        .await
}
