//! # WeChat API Client
//!
//! Client for the official account API: credential refresh, media uploads and
//! mass messages. Every request is bounded by the timeout given at
//! construction; a timeout is reported as [`PlatformError::Timeout`].

use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Serialize, de::DeserializeOwned};
use std::{path::Path, time::Duration};

use super::schemas::{
    ApiStatus, IssuedToken, MassDeleteRequest, MassMessage, MassSendReceipt, MassStatus,
    MassStatusRequest, NewsArticle, NewsUploadRequest, PreviewRequest, SendAllRequest,
    UploadedImage, UploadedMedia,
};
use crate::{
    api::errors::PlatformError,
    consts,
    models::media::MediaKind,
    services::{CredentialSource, PlatformApi},
};

/// WeChat API client
pub struct WechatClient {
    /// HTTP client for making API requests
    client: reqwest::Client,
    /// API origin, e.g. `https://api.weixin.qq.com`
    base_url: String,
}

impl WechatClient {
    /// Creates a new client whose requests time out after `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build WeChat http client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B, T>(&self, path: &str, token: &str, body: &B) -> Result<T, PlatformError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!("POST {}", path);

        let response = self
            .client
            .post(self.endpoint(path))
            .query(&[("access_token", token)])
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        read_response(response).await
    }

    async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        form: Form,
    ) -> Result<T, PlatformError> {
        tracing::debug!("POST {} (multipart)", path);

        let response = self
            .client
            .post(self.endpoint(path))
            .query(query)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        read_response(response).await
    }
}

/// Maps a reqwest failure, dropping the URL since it carries the access token
fn transport_error(err: reqwest::Error) -> PlatformError {
    if err.is_timeout() {
        return PlatformError::Timeout;
    }
    PlatformError::Transport(err.without_url().to_string())
}

/// Reads a platform response, turning a non-zero `errcode` into [`PlatformError::Api`]
async fn read_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PlatformError> {
    let status = response.status();
    let body = response.bytes().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(PlatformError::Transport(format!(
            "WeChat API returned error status {}: {}",
            status,
            String::from_utf8_lossy(&body)
        )));
    }

    let api_status: ApiStatus = serde_json::from_slice(&body).map_err(|e| {
        PlatformError::Transport(format!("failed to parse WeChat API response: {e}"))
    })?;

    if api_status.errcode != 0 {
        return Err(PlatformError::Api {
            code: api_status.errcode,
            message: api_status.errmsg,
        });
    }

    serde_json::from_slice(&body)
        .map_err(|e| PlatformError::Transport(format!("failed to parse WeChat API response: {e}")))
}

/// MIME type sent along the uploaded file, from its extension
fn guess_mime_type(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_lowercase();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "mp3" => "audio/mpeg",
        "amr" => "audio/amr",
        "wav" => "audio/wav",
        "wma" => "audio/x-ms-wma",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

fn file_form(content: &[u8], filename: &str) -> Result<Form, PlatformError> {
    let part = Part::bytes(content.to_vec())
        .file_name(filename.to_string())
        .mime_str(guess_mime_type(filename))
        .map_err(transport_error)?;

    Ok(Form::new().part(consts::UPLOAD_FIELD_NAME, part))
}

#[async_trait]
impl CredentialSource for WechatClient {
    async fn fetch_access_token(
        &self,
        app_id: &str,
        app_secret: &str,
    ) -> Result<IssuedToken, PlatformError> {
        let response = self
            .client
            .get(self.endpoint(consts::WECHAT_TOKEN_PATH))
            .query(&[
                ("grant_type", "client_credential"),
                ("appid", app_id),
                ("secret", app_secret),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        read_response(response).await
    }
}

#[async_trait]
impl PlatformApi for WechatClient {
    async fn upload_media(
        &self,
        token: &str,
        kind: MediaKind,
        content: &[u8],
        filename: &str,
    ) -> Result<UploadedMedia, PlatformError> {
        let form = file_form(content, filename)?;

        self.post_multipart(
            consts::WECHAT_MEDIA_UPLOAD_PATH,
            &[("access_token", token), ("type", kind.as_str())],
            form,
        )
        .await
    }

    async fn upload_news_image(
        &self,
        token: &str,
        content: &[u8],
        filename: &str,
    ) -> Result<String, PlatformError> {
        let form = file_form(content, filename)?;

        let image: UploadedImage = self
            .post_multipart(
                consts::WECHAT_NEWS_IMAGE_UPLOAD_PATH,
                &[("access_token", token)],
                form,
            )
            .await?;

        Ok(image.url)
    }

    async fn upload_news(
        &self,
        token: &str,
        articles: &[NewsArticle],
    ) -> Result<UploadedMedia, PlatformError> {
        self.post_json(
            consts::WECHAT_NEWS_UPLOAD_PATH,
            token,
            &NewsUploadRequest { articles },
        )
        .await
    }

    async fn send_all(
        &self,
        token: &str,
        message: &MassMessage,
    ) -> Result<MassSendReceipt, PlatformError> {
        self.post_json(
            consts::WECHAT_MASS_SEND_ALL_PATH,
            token,
            &SendAllRequest::to_all(message),
        )
        .await
    }

    async fn preview(
        &self,
        token: &str,
        to_user: &str,
        message: &MassMessage,
    ) -> Result<(), PlatformError> {
        let _: ApiStatus = self
            .post_json(
                consts::WECHAT_MASS_PREVIEW_PATH,
                token,
                &PreviewRequest {
                    touser: to_user,
                    message,
                },
            )
            .await?;

        Ok(())
    }

    async fn get_mass_status(
        &self,
        token: &str,
        msg_id: i64,
    ) -> Result<MassStatus, PlatformError> {
        self.post_json(
            consts::WECHAT_MASS_GET_PATH,
            token,
            &MassStatusRequest {
                msg_id: msg_id.to_string(),
            },
        )
        .await
    }

    async fn delete_mass(
        &self,
        token: &str,
        msg_id: i64,
        article_idx: u32,
    ) -> Result<(), PlatformError> {
        let _: ApiStatus = self
            .post_json(
                consts::WECHAT_MASS_DELETE_PATH,
                token,
                &MassDeleteRequest {
                    msg_id,
                    article_idx,
                },
            )
            .await?;

        Ok(())
    }
}
