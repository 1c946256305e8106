pub mod wechat;

use async_trait::async_trait;
use std::sync::Arc;

use crate::{api::errors::PlatformError, models::media::MediaKind};
use wechat::schemas::{
    IssuedToken, MassMessage, MassSendReceipt, MassStatus, NewsArticle, UploadedMedia,
};

/// Issues platform access tokens from the app credentials.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch_access_token(
        &self,
        app_id: &str,
        app_secret: &str,
    ) -> Result<IssuedToken, PlatformError>;
}

/// Authenticated calls to the messaging platform. Every method performs
/// exactly one network request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformApi: Send + Sync {
    async fn upload_media(
        &self,
        token: &str,
        kind: MediaKind,
        content: &[u8],
        filename: &str,
    ) -> Result<UploadedMedia, PlatformError>;

    /// Uploads an image meant to be referenced inside article bodies and
    /// returns its URL.
    async fn upload_news_image(
        &self,
        token: &str,
        content: &[u8],
        filename: &str,
    ) -> Result<String, PlatformError>;

    /// Stores an ordered article bundle, accepted or rejected as a whole.
    async fn upload_news(
        &self,
        token: &str,
        articles: &[NewsArticle],
    ) -> Result<UploadedMedia, PlatformError>;

    async fn send_all(
        &self,
        token: &str,
        message: &MassMessage,
    ) -> Result<MassSendReceipt, PlatformError>;

    async fn preview(
        &self,
        token: &str,
        to_user: &str,
        message: &MassMessage,
    ) -> Result<(), PlatformError>;

    async fn get_mass_status(&self, token: &str, msg_id: i64)
    -> Result<MassStatus, PlatformError>;

    /// `article_idx` is 1-based; 0 removes the whole broadcast.
    async fn delete_mass(
        &self,
        token: &str,
        msg_id: i64,
        article_idx: u32,
    ) -> Result<(), PlatformError>;
}

pub type ImplPlatformApi = Arc<dyn PlatformApi>;
pub type ImplCredentialSource = Arc<dyn CredentialSource>;
