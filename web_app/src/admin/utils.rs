use futures::{Stream, TryStreamExt};
use std::pin::pin;

use super::errors::ApiError;
use crate::consts;

/// File received through a multipart form
pub struct UploadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

fn get_header_str_value(headers: &ntex::http::HeaderMap, key: &str) -> String {
    let default_header_value = ntex::http::header::HeaderValue::from_static("");

    headers
        .get(key)
        .unwrap_or(&default_header_value)
        .to_str()
        .unwrap_or_default()
        .to_string()
}

/// Value of a `key=` section of a content-disposition header, unquoted
fn get_disposition_param(content_disposition: &str, key: &str) -> Option<String> {
    let prefix = format!("{key}=");
    content_disposition
        .split(';')
        .map(str::trim)
        .find_map(|section| section.strip_prefix(prefix.as_str()))
        .map(|value| value.trim_matches('"').trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Concats all the [bytes](ntex::util::Bytes) extracted from the field.
///
/// Fails as soon as the stream breaks or the running length goes over
/// `max_size`.
pub async fn get_bytes_value<S, E>(field: S, max_size: usize) -> Result<Vec<u8>, ApiError>
where
    S: Stream<Item = Result<ntex::util::Bytes, E>>,
    E: std::fmt::Display,
{
    let mut field = pin!(field);
    let mut content = Vec::new();

    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?
    {
        if content.len() + chunk.len() > max_size {
            return Err(ApiError::BadRequest(format!(
                "file is too big. max size: {max_size}"
            )));
        }
        content.extend_from_slice(&chunk);
    }

    Ok(content)
}

/// Reads the file sent in the `media` field of a multipart form.
pub async fn read_uploaded_file(
    mut payload: ntex_multipart::Multipart,
) -> Result<UploadedFile, ApiError> {
    while let Some(field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let content_disposition = get_header_str_value(field.headers(), "content-disposition");

        if get_disposition_param(&content_disposition, "name").as_deref()
            != Some(consts::UPLOAD_FIELD_NAME)
        {
            continue;
        }

        let filename = get_disposition_param(&content_disposition, "filename")
            .unwrap_or_else(|| consts::UPLOAD_FIELD_NAME.to_string());
        let content = get_bytes_value(field, consts::UPLOAD_MAX_SIZE_BYTES).await?;

        return Ok(UploadedFile { filename, content });
    }

    Err(ApiError::BadRequest(format!(
        "multipart field `{}` is missing",
        consts::UPLOAD_FIELD_NAME
    )))
}
