//! Admin route configuration.

use super::announcement;
use ntex::web;

/// Configures the broadcast announcement routes.
///
/// All routes require an active operator session in the `Token` header.
///
/// # Routes
/// - `POST /announcement/media/{kind}` - Upload a media asset (multipart `media` field)
/// - `POST /announcement/news/image` - Upload an image to embed in article bodies
/// - `POST /announcement/news/upload` - Upload an article bundle
/// - `POST /announcement/news` - Broadcast articles to every subscriber
/// - `POST /announcement/text` - Broadcast a text message
/// - `POST /announcement/voice` - Broadcast an uploaded voice asset
/// - `POST /announcement/image` - Broadcast an uploaded image asset
/// - `POST /announcement/preview` - Send a broadcast body to one subscriber
/// - `GET /announcement/{msg_id}/status` - Delivery status of a broadcast
/// - `GET /announcement/{msg_id}` - Last known local record of a broadcast
/// - `DELETE /announcement/{msg_id}/{article_idx}` - Retract one article
pub fn announcement(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/announcement").service((
        announcement::upload_media,
        announcement::upload_news_image,
        announcement::upload_news,
        announcement::send_news,
        announcement::send_text,
        announcement::send_voice,
        announcement::send_image,
        announcement::send_preview,
        announcement::get_status,
        announcement::get_broadcast,
        announcement::retract_article,
    )));
}
