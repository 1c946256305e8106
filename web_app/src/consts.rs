/// Platform error codes meaning the access token is invalid or expired
pub const AUTH_EXPIRED_CODES: [i64; 3] = [40001, 40014, 42001];
/// Platform error codes meaning a call quota was exhausted
pub const RATE_LIMITED_CODES: [i64; 2] = [45009, 45011];
/// Platform error codes meaning the referenced data does not exist
pub const NOT_FOUND_CODES: [i64; 1] = [46003];

pub const WECHAT_TOKEN_PATH: &str = "/cgi-bin/token";
pub const WECHAT_MEDIA_UPLOAD_PATH: &str = "/cgi-bin/media/upload";
pub const WECHAT_NEWS_IMAGE_UPLOAD_PATH: &str = "/cgi-bin/media/uploadimg";
pub const WECHAT_NEWS_UPLOAD_PATH: &str = "/cgi-bin/media/uploadnews";
pub const WECHAT_MASS_SEND_ALL_PATH: &str = "/cgi-bin/message/mass/sendall";
pub const WECHAT_MASS_PREVIEW_PATH: &str = "/cgi-bin/message/mass/preview";
pub const WECHAT_MASS_GET_PATH: &str = "/cgi-bin/message/mass/get";
pub const WECHAT_MASS_DELETE_PATH: &str = "/cgi-bin/message/mass/delete";

/// Header carrying the operator session token on admin requests
pub const OPERATOR_TOKEN_HEADER: &str = "Token";
/// Multipart field holding the uploaded file
pub const UPLOAD_FIELD_NAME: &str = "media";
pub const UPLOAD_MAX_SIZE_BYTES: usize = 10_000_000;

/// Body the platform expects back after an event delivery
pub const WEBHOOK_ACK_BODY: &str = "success";
