//! Broadcast announcement endpoints used by the account operators.
//!
//! Every handler first checks the operator session, then delegates to the
//! matching [`api`] operation.

use ntex::web;
use serde::{Deserialize, Serialize};

use super::{AppState, errors::ApiError, ok_response, session, utils};
use crate::{
    api,
    models::{
        broadcast::{ArticleDraft, BroadcastRequest},
        media::MediaKind,
    },
};

#[derive(Debug, Deserialize)]
pub struct NewsBody {
    pub articles: Vec<ArticleDraft>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaBody {
    pub media_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewBody {
    /// Subscriber that receives the preview
    pub touser: String,
    pub message: BroadcastRequest,
}

#[derive(Debug, Serialize)]
pub struct ArticleImage {
    pub url: String,
}

async fn dispatch(
    req: &web::HttpRequest,
    app_state: &AppState,
    request: BroadcastRequest,
) -> Result<web::HttpResponse, web::Error> {
    session::authorize(req, &app_state.repo).await?;

    let broadcast = api::broadcast::dispatch(&app_state.platform, &app_state.repo, &request)
        .await
        .map_err(ApiError::from)?;

    Ok(ok_response(broadcast))
}

#[web::post("/media/{kind}")]
async fn upload_media(
    req: web::HttpRequest,
    path: web::types::Path<String>,
    payload: ntex_multipart::Multipart,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    session::authorize(&req, &app_state.repo).await?;

    let media_kind = path
        .into_inner()
        .parse::<MediaKind>()
        .map_err(ApiError::from)?;
    let file = utils::read_uploaded_file(payload).await?;

    let asset = api::media::upload(
        &app_state.platform,
        media_kind,
        &file.content,
        &file.filename,
    )
    .await
    .map_err(ApiError::from)?;

    Ok(ok_response(asset))
}

#[web::post("/news/image")]
async fn upload_news_image(
    req: web::HttpRequest,
    payload: ntex_multipart::Multipart,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    session::authorize(&req, &app_state.repo).await?;

    let file = utils::read_uploaded_file(payload).await?;
    let url = api::media::upload_article_image(&app_state.platform, &file.content, &file.filename)
        .await
        .map_err(ApiError::from)?;

    Ok(ok_response(ArticleImage { url }))
}

#[web::post("/news/upload")]
async fn upload_news(
    req: web::HttpRequest,
    body: web::types::Json<NewsBody>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    session::authorize(&req, &app_state.repo).await?;

    let bundle = api::broadcast::upload_article_bundle(&app_state.platform, &body.articles)
        .await
        .map_err(ApiError::from)?;

    Ok(ok_response(bundle))
}

#[web::post("/news")]
async fn send_news(
    req: web::HttpRequest,
    body: web::types::Json<NewsBody>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let body = body.into_inner();
    dispatch(&req, &app_state, BroadcastRequest::News(body.articles)).await
}

#[web::post("/text")]
async fn send_text(
    req: web::HttpRequest,
    body: web::types::Json<TextBody>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let body = body.into_inner();
    dispatch(&req, &app_state, BroadcastRequest::Text(body.content)).await
}

#[web::post("/voice")]
async fn send_voice(
    req: web::HttpRequest,
    body: web::types::Json<MediaBody>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let body = body.into_inner();
    dispatch(&req, &app_state, BroadcastRequest::Voice(body.media_id)).await
}

#[web::post("/image")]
async fn send_image(
    req: web::HttpRequest,
    body: web::types::Json<MediaBody>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let body = body.into_inner();
    dispatch(&req, &app_state, BroadcastRequest::Image(body.media_id)).await
}

#[web::post("/preview")]
async fn send_preview(
    req: web::HttpRequest,
    body: web::types::Json<PreviewBody>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    session::authorize(&req, &app_state.repo).await?;

    api::broadcast::preview(&app_state.platform, &body.message, &body.touser)
        .await
        .map_err(ApiError::from)?;

    Ok(ok_response(()))
}

/// Asks the platform for the delivery status and keeps the last observed
/// phase on the local record.
#[web::get("/{msg_id}/status")]
async fn get_status(
    req: web::HttpRequest,
    path: web::types::Path<i64>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    session::authorize(&req, &app_state.repo).await?;

    let broadcast_id = path.into_inner();
    let status = api::status::get_status(&app_state.platform, broadcast_id)
        .await
        .map_err(ApiError::from)?;

    if let Err(e) = app_state
        .repo
        .update_broadcast_phase(broadcast_id, status.phase)
        .await
    {
        logfire::warn!(
            "failed to store phase of broadcast {id}: {error}",
            id = broadcast_id,
            error = e.to_string()
        );
    }

    Ok(ok_response(status))
}

#[web::get("/{msg_id}")]
async fn get_broadcast(
    req: web::HttpRequest,
    path: web::types::Path<i64>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    session::authorize(&req, &app_state.repo).await?;

    let broadcast_id = path.into_inner();
    let stored = app_state
        .repo
        .get_broadcast(broadcast_id)
        .await
        .map_err(|e| ApiError::Internal(format!("get_broadcast raised an error: {}", e)))?
        .ok_or_else(|| ApiError::NotFound(format!("broadcast {broadcast_id} not found")))?;

    Ok(ok_response(stored))
}

#[web::delete("/{msg_id}/{article_idx}")]
async fn retract_article(
    req: web::HttpRequest,
    path: web::types::Path<(i64, u32)>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    session::authorize(&req, &app_state.repo).await?;

    let (broadcast_id, article_index) = path.into_inner();
    api::retraction::retract_article(
        &app_state.platform,
        &app_state.repo,
        broadcast_id,
        article_index,
    )
    .await
    .map_err(ApiError::from)?;

    Ok(ok_response(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        admin::routes,
        api::testing,
        models::broadcast::{Broadcast, DeliveryPhase, StoredBroadcast},
        repo::MockAppRepo,
        services::{
            MockPlatformApi,
            wechat::schemas::{MassSendReceipt, MassStatus},
        },
    };
    use mockall::predicate::*;
    use ntex::{
        http,
        web::{App, test},
    };
    use serde_json::{Value, json};

    const SESSION: &str = "session-1";

    fn repo_with_session() -> MockAppRepo {
        let mut repo = MockAppRepo::new();
        repo.expect_is_operator_session_active()
            .returning(|token| Ok(token == SESSION));
        repo
    }

    fn app_state(api: MockPlatformApi, repo: MockAppRepo) -> AppState {
        AppState {
            repo: Box::new(repo),
            platform: testing::platform(api),
            webhook_token: "abc".into(),
        }
    }

    async fn body_json(resp: web::WebResponse) -> Value {
        serde_json::from_slice(&test::read_body(resp).await).unwrap()
    }

    #[ntex::test]
    async fn test_missing_session_is_unauthorized() {
        let state = app_state(MockPlatformApi::new(), repo_with_session());
        let app = test::init_service(App::new().state(state).configure(routes::announcement)).await;

        let req = test::TestRequest::post()
            .uri("/announcement/text")
            .set_json(&json!({"content": "hello"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
        let body = body_json(resp).await;
        assert_eq!(body["code"], -1);
        assert_eq!(body["data"], Value::Null);
    }

    #[ntex::test]
    async fn test_image_dispatch_returns_envelope() {
        let mut api = MockPlatformApi::new();
        api.expect_send_all().times(1).returning(|_, _| {
            Ok(MassSendReceipt {
                msg_id: 501,
                msg_data_id: None,
            })
        });
        let mut repo = repo_with_session();
        repo.expect_save_broadcast().times(1).returning(|_| Ok(()));
        let app =
            test::init_service(App::new().state(app_state(api, repo)).configure(routes::announcement))
                .await;

        let req = test::TestRequest::post()
            .uri("/announcement/image")
            .header("Token", SESSION)
            .set_json(&json!({"media_id": "media_123"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), http::StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["code"], 0);
        assert_eq!(body["msg"], "OK");
        assert_eq!(body["data"]["id"], 501);
        assert_eq!(body["data"]["kind"], "image");
    }

    #[ntex::test]
    async fn test_empty_news_is_bad_request() {
        let state = app_state(MockPlatformApi::new(), repo_with_session());
        let app = test::init_service(App::new().state(state).configure(routes::announcement)).await;

        let req = test::TestRequest::post()
            .uri("/announcement/news")
            .header("Token", SESSION)
            .set_json(&json!({"articles": []}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), http::StatusCode::BAD_REQUEST);
    }

    #[ntex::test]
    async fn test_status_writes_back_phase() {
        let mut api = MockPlatformApi::new();
        api.expect_get_mass_status()
            .with(always(), eq(501))
            .times(1)
            .returning(|_, _| {
                Ok(MassStatus {
                    msg_id: 501,
                    msg_status: "SEND_SUCCESS".into(),
                    total_count: 950,
                    sent_count: 950,
                    error_count: 0,
                })
            });
        let mut repo = repo_with_session();
        repo.expect_update_broadcast_phase()
            .with(eq(501), eq(DeliveryPhase::Sent))
            .times(1)
            .returning(|_, _| Ok(()));
        let app =
            test::init_service(App::new().state(app_state(api, repo)).configure(routes::announcement))
                .await;

        let req = test::TestRequest::get()
            .uri("/announcement/501/status")
            .header("Token", SESSION)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), http::StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["phase"], "sent");
        assert_eq!(body["data"]["succeeded"], 950);
    }

    #[ntex::test]
    async fn test_get_broadcast() {
        let mut repo = repo_with_session();
        repo.expect_get_broadcast()
            .with(eq(501))
            .returning(|id| {
                Ok(Some(StoredBroadcast {
                    broadcast: Broadcast::dispatched(id, &BroadcastRequest::Text("hi".into())),
                    dispatched_articles: 0,
                }))
            });
        repo.expect_get_broadcast()
            .with(eq(404))
            .returning(|_| Ok(None));
        let app = test::init_service(
            App::new()
                .state(app_state(MockPlatformApi::new(), repo))
                .configure(routes::announcement),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/announcement/501")
            .header("Token", SESSION)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(body_json(resp).await["data"]["broadcast"]["kind"], "text");

        let req = test::TestRequest::get()
            .uri("/announcement/404")
            .header("Token", SESSION)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
    }

    #[ntex::test]
    async fn test_retract_sends_one_based_index() {
        let mut api = MockPlatformApi::new();
        api.expect_delete_mass()
            .with(always(), eq(601), eq(2))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut repo = repo_with_session();
        repo.expect_get_broadcast().returning(|_| Ok(None));
        repo.expect_mark_article_retracted()
            .with(eq(601), eq(1))
            .times(1)
            .returning(|_, _| Ok(()));
        let app =
            test::init_service(App::new().state(app_state(api, repo)).configure(routes::announcement))
                .await;

        let req = test::TestRequest::delete()
            .uri("/announcement/601/1")
            .header("Token", SESSION)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), http::StatusCode::OK);
    }
}
