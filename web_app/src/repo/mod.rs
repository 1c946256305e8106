pub mod sqlite;
pub mod sqlite_queries;

use crate::models::broadcast::{Broadcast, DeliveryPhase, StoredBroadcast};
use async_trait::async_trait;

/// Local store of dispatched broadcasts. It only mirrors what the platform
/// accepted; platform calls never depend on it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppRepo: Send + Sync {
    async fn save_broadcast(&self, broadcast: &Broadcast) -> anyhow::Result<()>;

    /// Last known record, listing only articles that were not retracted.
    async fn get_broadcast(&self, broadcast_id: i64) -> anyhow::Result<Option<StoredBroadcast>>;

    async fn mark_article_retracted(
        &self,
        broadcast_id: i64,
        article_index: u32,
    ) -> anyhow::Result<()>;

    async fn update_broadcast_phase(
        &self,
        broadcast_id: i64,
        phase: DeliveryPhase,
    ) -> anyhow::Result<()>;

    async fn is_operator_session_active(&self, token: &str) -> anyhow::Result<bool>;
}

pub type ImplAppRepo = Box<dyn AppRepo>;
