use crate::models::broadcast::{Article, Broadcast, BroadcastKind, DeliveryPhase, StoredBroadcast};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, Row, SqlitePool, sqlite::SqliteRow};

use super::{AppRepo, sqlite_queries};

#[derive(Clone)]
pub struct SqlxSqliteRepo {
    pub db_pool: SqlitePool,
}

impl FromRow<'_, SqliteRow> for Article {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            index: row.try_get("article_index")?,
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            media_ref: row.try_get("media_ref")?,
        })
    }
}

impl FromRow<'_, SqliteRow> for StoredBroadcast {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            broadcast: Broadcast {
                id: row.try_get("id")?,
                kind: serde_json::from_str::<BroadcastKind>(&format!(
                    "\"{}\"",
                    row.try_get::<String, &str>("kind")?
                ))
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
                articles: Vec::new(),
                status: serde_json::from_str::<DeliveryPhase>(&format!(
                    "\"{}\"",
                    row.try_get::<String, &str>("status")?
                ))
                .unwrap_or_default(),
                created_at: row.try_get("created_at")?,
            },
            dispatched_articles: row.try_get("article_count")?,
        })
    }
}

#[async_trait]
impl AppRepo for SqlxSqliteRepo {
    async fn save_broadcast(&self, broadcast: &Broadcast) -> anyhow::Result<()> {
        let mut transaction = self.db_pool.begin().await?;

        sqlx::query(sqlite_queries::QUERY_INSERT_BROADCAST)
            .bind(broadcast.id)
            .bind(broadcast.kind.to_string())
            .bind(broadcast.status.to_string())
            .bind(broadcast.articles.len() as u32)
            .bind(broadcast.created_at)
            .bind(Utc::now())
            .execute(&mut *transaction)
            .await?;

        for article in &broadcast.articles {
            sqlx::query(sqlite_queries::QUERY_INSERT_BROADCAST_ARTICLE)
                .bind(broadcast.id)
                .bind(article.index)
                .bind(&article.title)
                .bind(&article.body)
                .bind(&article.media_ref)
                .execute(&mut *transaction)
                .await?;
        }

        transaction.commit().await?;

        Ok(())
    }

    async fn get_broadcast(&self, broadcast_id: i64) -> anyhow::Result<Option<StoredBroadcast>> {
        let Some(mut stored) =
            sqlx::query_as::<_, StoredBroadcast>(sqlite_queries::QUERY_GET_BROADCAST)
                .bind(broadcast_id)
                .fetch_optional(&self.db_pool)
                .await?
        else {
            return Ok(None);
        };

        stored.broadcast.articles =
            sqlx::query_as::<_, Article>(sqlite_queries::QUERY_GET_LIVE_BROADCAST_ARTICLES)
                .bind(broadcast_id)
                .fetch_all(&self.db_pool)
                .await?;

        Ok(Some(stored))
    }

    async fn mark_article_retracted(
        &self,
        broadcast_id: i64,
        article_index: u32,
    ) -> anyhow::Result<()> {
        Ok(sqlx::query(sqlite_queries::QUERY_MARK_ARTICLE_RETRACTED)
            .bind(broadcast_id)
            .bind(article_index)
            .bind(Utc::now())
            .execute(&self.db_pool)
            .await
            .map(|_| ())?)
    }

    async fn update_broadcast_phase(
        &self,
        broadcast_id: i64,
        phase: DeliveryPhase,
    ) -> anyhow::Result<()> {
        Ok(sqlx::query(sqlite_queries::QUERY_UPDATE_BROADCAST_STATUS)
            .bind(broadcast_id)
            .bind(phase.to_string())
            .bind(Utc::now())
            .execute(&self.db_pool)
            .await
            .map(|_| ())?)
    }

    async fn is_operator_session_active(&self, token: &str) -> anyhow::Result<bool> {
        Ok(
            sqlx::query(sqlite_queries::QUERY_IS_OPERATOR_SESSION_ACTIVE)
                .bind(token)
                .bind(Utc::now())
                .fetch_one(&self.db_pool)
                .await?
                .try_get("is_active")?,
        )
    }
}

#[cfg(test)]
impl SqlxSqliteRepo {
    /// Fresh in-memory database with every migration applied
    pub async fn in_memory() -> anyhow::Result<Self> {
        let db_pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        for migration in [
            include_str!("../../../migrations/0001_broadcast.sql"),
            include_str!("../../../migrations/0002_operator_session.sql"),
        ] {
            sqlx::raw_sql(migration).execute(&db_pool).await?;
        }

        Ok(Self { db_pool })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::broadcast::{ArticleDraft, BroadcastRequest};
    use chrono::TimeDelta;

    fn news(id: i64, titles: &[&str]) -> Broadcast {
        let drafts = titles
            .iter()
            .map(|title| ArticleDraft {
                title: title.to_string(),
                body: format!("body of {title}"),
                media_ref: Some(format!("thumb_{title}")),
                ..Default::default()
            })
            .collect();
        Broadcast::dispatched(id, &BroadcastRequest::News(drafts))
    }

    #[tokio::test]
    async fn test_save_and_get_broadcast() {
        let repo = SqlxSqliteRepo::in_memory().await.unwrap();
        let broadcast = news(601, &["A", "B", "C"]);

        repo.save_broadcast(&broadcast).await.unwrap();
        let stored = repo.get_broadcast(601).await.unwrap().unwrap();

        assert_eq!(stored.dispatched_articles, 3);
        assert_eq!(stored.broadcast.kind, BroadcastKind::News);
        assert_eq!(stored.broadcast.status, DeliveryPhase::Sending);
        assert_eq!(stored.broadcast.articles, broadcast.articles);
        assert!(repo.get_broadcast(602).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retracted_article_keeps_other_indices() {
        let repo = SqlxSqliteRepo::in_memory().await.unwrap();
        repo.save_broadcast(&news(601, &["A", "B", "C"])).await.unwrap();

        repo.mark_article_retracted(601, 1).await.unwrap();
        // a second mark leaves the first retraction time untouched
        repo.mark_article_retracted(601, 1).await.unwrap();

        let stored = repo.get_broadcast(601).await.unwrap().unwrap();
        let indices = stored
            .broadcast
            .articles
            .iter()
            .map(|article| article.index)
            .collect::<Vec<_>>();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(stored.dispatched_articles, 3);
    }

    #[tokio::test]
    async fn test_update_broadcast_phase() {
        let repo = SqlxSqliteRepo::in_memory().await.unwrap();
        let broadcast = Broadcast::dispatched(501, &BroadcastRequest::Image("media_123".into()));
        repo.save_broadcast(&broadcast).await.unwrap();

        repo.update_broadcast_phase(501, DeliveryPhase::PartialFailure)
            .await
            .unwrap();

        let stored = repo.get_broadcast(501).await.unwrap().unwrap();
        assert_eq!(stored.broadcast.status, DeliveryPhase::PartialFailure);
        assert!(stored.broadcast.articles.is_empty());
    }

    #[tokio::test]
    async fn test_operator_session() {
        let repo = SqlxSqliteRepo::in_memory().await.unwrap();
        let now = Utc::now();
        for (token, expires_at) in [
            ("live", now + TimeDelta::hours(1)),
            ("expired", now - TimeDelta::hours(1)),
        ] {
            sqlx::query(
                "INSERT INTO operator_session(token,operator_name,expires_at,created_at) VALUES($1,$2,$3,$4);",
            )
            .bind(token)
            .bind("ops")
            .bind(expires_at)
            .bind(now)
            .execute(&repo.db_pool)
            .await
            .unwrap();
        }

        assert!(repo.is_operator_session_active("live").await.unwrap());
        assert!(!repo.is_operator_session_active("expired").await.unwrap());
        assert!(!repo.is_operator_session_active("unknown").await.unwrap());
    }
}
