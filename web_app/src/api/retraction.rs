//! # Article Retraction
//!
//! Removes one article from a dispatched news broadcast. Local records are
//! only consulted to reject requests that can never succeed; when there is no
//! local record the platform decides.

use super::{
    Platform,
    errors::{RetractionError, ValidationError},
};
use crate::{metric, models::broadcast::BroadcastKind, repo};

/// Retracts article `article_index` (0-based, as assigned at dispatch) from
/// broadcast `broadcast_id`.
///
/// Retracting the same article twice sends both requests to the platform and
/// returns whatever it answers the second time.
pub async fn retract_article(
    platform: &Platform,
    repo: &repo::ImplAppRepo,
    broadcast_id: i64,
    article_index: u32,
) -> Result<(), RetractionError> {
    let _span = logfire::span!(
        "retract article {index} of {id}",
        index = i64::from(article_index),
        id = broadcast_id
    )
    .entered();

    let stored = repo.get_broadcast(broadcast_id).await.unwrap_or_else(|e| {
        logfire::warn!(
            "local record of broadcast {id} unavailable: {error}",
            id = broadcast_id,
            error = e.to_string()
        );
        None
    });

    if let Some(stored) = stored {
        if stored.broadcast.kind != BroadcastKind::News {
            return Err(ValidationError::NotNewsBroadcast(broadcast_id).into());
        }
        if !stored.had_article(article_index) {
            return Err(RetractionError::NotFound {
                broadcast_id,
                article_index,
            });
        }
    }

    // the platform counts articles from 1, 0 would delete the whole broadcast
    let article_idx = article_index
        .checked_add(1)
        .ok_or(RetractionError::NotFound {
            broadcast_id,
            article_index,
        })?;

    let api = &platform.api;
    let result = platform
        .with_token::<_, RetractionError, _, _>(|token| async move {
            api.delete_mass(&token.value, broadcast_id, article_idx)
                .await
        })
        .await;

    if let Err(err) = result {
        logfire::warn!("retraction failed: {error}", error = err.to_string());
        metric::incr_retraction_statds("failed");
        return Err(err);
    }

    metric::incr_retraction_statds("retracted");
    if let Err(e) = repo
        .mark_article_retracted(broadcast_id, article_index)
        .await
    {
        logfire::error!(
            "failed to mark article {index} of {id} retracted: {error}",
            index = i64::from(article_index),
            id = broadcast_id,
            error = e.to_string()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{broadcast, errors::PlatformError, testing},
        models::broadcast::{ArticleDraft, Broadcast, BroadcastRequest, StoredBroadcast},
        repo::{MockAppRepo, sqlite::SqlxSqliteRepo},
        services::{
            MockPlatformApi,
            wechat::schemas::{MassSendReceipt, UploadedMedia},
        },
    };
    use mockall::predicate::*;

    fn news_request() -> BroadcastRequest {
        BroadcastRequest::News(vec![
            ArticleDraft {
                title: "A".into(),
                body: "first".into(),
                ..Default::default()
            },
            ArticleDraft {
                title: "B".into(),
                body: "second".into(),
                ..Default::default()
            },
        ])
    }

    fn stored(request: &BroadcastRequest) -> StoredBroadcast {
        let broadcast = Broadcast::dispatched(601, request);
        StoredBroadcast {
            dispatched_articles: broadcast.articles.len() as u32,
            broadcast,
        }
    }

    fn repo_with(record: Option<StoredBroadcast>, marks: usize) -> repo::ImplAppRepo {
        let mut repo = MockAppRepo::new();
        repo.expect_get_broadcast()
            .returning(move |_| Ok(record.clone()));
        repo.expect_mark_article_retracted()
            .times(marks)
            .returning(|_, _| Ok(()));
        Box::new(repo)
    }

    #[tokio::test]
    async fn test_retracted_article_is_hidden_from_local_listing() {
        let mut api = MockPlatformApi::new();
        api.expect_upload_news().times(1).returning(|_, _| {
            Ok(UploadedMedia {
                media_type: "news".into(),
                media_id: "bundle_601".into(),
                created_at: 0,
            })
        });
        api.expect_send_all().times(1).returning(|_, _| {
            Ok(MassSendReceipt {
                msg_id: 601,
                msg_data_id: None,
            })
        });
        api.expect_delete_mass()
            .with(eq("tok-1"), eq(601), eq(2))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let platform = testing::platform(api);
        let repo: repo::ImplAppRepo = Box::new(SqlxSqliteRepo::in_memory().await.unwrap());

        let broadcast = broadcast::dispatch(&platform, &repo, &news_request())
            .await
            .unwrap();
        assert_eq!(broadcast.id, 601);

        retract_article(&platform, &repo, 601, 1).await.unwrap();

        let record = repo.get_broadcast(601).await.unwrap().unwrap();
        let titles = record
            .broadcast
            .articles
            .iter()
            .map(|article| article.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["A"]);
        assert_eq!(record.broadcast.articles[0].index, 0);
        assert_eq!(record.dispatched_articles, 2);
    }

    #[ntex::test]
    async fn test_second_retraction_is_sent_to_platform() {
        let mut api = MockPlatformApi::new();
        // the platform acknowledges a repeated delete of the same article
        // with `{"errcode":0,"errmsg":"ok"}`, like the first one
        api.expect_delete_mass()
            .with(eq("tok-1"), eq(601), eq(2))
            .times(2)
            .returning(|_, _, _| Ok(()));
        let platform = testing::platform(api);
        let repo = repo_with(Some(stored(&news_request())), 2);

        assert_eq!(retract_article(&platform, &repo, 601, 1).await, Ok(()));
        assert_eq!(retract_article(&platform, &repo, 601, 1).await, Ok(()));
    }

    #[ntex::test]
    async fn test_platform_rejection_is_surfaced() {
        let mut api = MockPlatformApi::new();
        api.expect_delete_mass()
            .with(eq("tok-1"), eq(601), eq(1))
            .times(1)
            .returning(|_, _, _| {
                Err(PlatformError::Api {
                    code: 45028,
                    message: "has no masssend quota".into(),
                })
            });
        let platform = testing::platform(api);
        let repo = repo_with(Some(stored(&news_request())), 0);

        assert_eq!(
            retract_article(&platform, &repo, 601, 0).await,
            Err(RetractionError::Rejected {
                code: 45028,
                reason: "has no masssend quota".into()
            })
        );
    }

    #[ntex::test]
    async fn test_index_never_dispatched_is_not_found() {
        let platform = testing::platform(MockPlatformApi::new());
        let repo = repo_with(Some(stored(&news_request())), 0);

        assert_eq!(
            retract_article(&platform, &repo, 601, 2).await,
            Err(RetractionError::NotFound {
                broadcast_id: 601,
                article_index: 2
            })
        );
    }

    #[ntex::test]
    async fn test_non_news_broadcast_is_rejected_locally() {
        let platform = testing::platform(MockPlatformApi::new());
        let record = stored(&BroadcastRequest::Text("hello".into()));
        let repo = repo_with(Some(record), 0);

        assert_eq!(
            retract_article(&platform, &repo, 601, 0).await,
            Err(RetractionError::Validation(
                ValidationError::NotNewsBroadcast(601)
            ))
        );
    }

    #[ntex::test]
    async fn test_without_local_record_platform_decides() {
        let mut api = MockPlatformApi::new();
        api.expect_delete_mass()
            .with(eq("tok-1"), eq(900), eq(1))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let platform = testing::platform(api);
        let repo = repo_with(None, 1);

        assert_eq!(retract_article(&platform, &repo, 900, 0).await, Ok(()));
    }
}
