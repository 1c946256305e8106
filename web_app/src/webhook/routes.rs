use ntex::web;

/// Configures the platform webhook routes.
///
/// These routes are public; requests are authenticated by their signature.
///
/// # Routes
/// - `GET /wechat` - Server address handshake
/// - `POST /wechat` - Event delivery
pub fn wechat(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/wechat").service((super::wechat::verify, super::wechat::receive)));
}
