//! Backblaze B2 native API calls (v2).

use std::fmt;

use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::json;
use sha1::{Digest, Sha1};

use crate::error::StorageError;

/// Failure of a single B2 call.
#[derive(Debug)]
pub(crate) enum ApiError {
    /// The authorization token is expired or no longer accepted.
    Expired,
    /// The request never got a response.
    Transport(reqwest::Error),
    /// B2 answered with an error document.
    Status {
        status: u16,
        code: String,
        message: String,
    },
    /// The response body could not be decoded.
    Decode(String),
}

impl ApiError {
    /// Whether a fresh authorization (and a fresh upload target) may fix it.
    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            Self::Expired => true,
            Self::Transport(err) => err.is_connect() || err.is_timeout(),
            Self::Status { .. } | Self::Decode(_) => false,
        }
    }

}

/// Whether an error code means the addressed file does not exist.
pub(crate) fn is_missing_code(code: &str) -> bool {
    matches!(code, "file_not_present" | "no_such_file" | "not_found")
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => f.write_str("authorization token expired"),
            Self::Transport(err) => write!(f, "transport error: {err}"),
            Self::Status {
                status,
                code,
                message,
            } => write!(f, "{status} {code}: {message}"),
            Self::Decode(msg) => write!(f, "invalid response: {msg}"),
        }
    }
}

impl From<ApiError> for StorageError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Expired | ApiError::Transport(_) => StorageError::unavailable(err.to_string()),
            ApiError::Status { status, .. } if status >= 500 => {
                StorageError::unavailable(err.to_string())
            }
            ApiError::Status {
                status,
                code,
                message,
            } => StorageError::Rejected {
                status,
                code,
                message,
            },
            ApiError::Decode(msg) => StorageError::write(msg),
        }
    }
}

/// Error document returned by B2.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    status: u16,
    code: String,
    #[serde(default)]
    message: String,
}

impl From<ErrorBody> for ApiError {
    fn from(body: ErrorBody) -> Self {
        let expired = body.status == 401
            && (body.code == "expired_auth_token" || body.code == "bad_auth_token");

        if expired {
            Self::Expired
        } else {
            Self::Status {
                status: body.status,
                code: body.code,
                message: body.message,
            }
        }
    }
}

/// Result of `b2_authorize_account`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Authorization {
    pub account_id: String,
    pub authorization_token: String,
    pub api_url: String,
    #[serde(default)]
    pub recommended_part_size: Option<u64>,
}

/// An upload URL and the token that goes with it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadTarget {
    pub upload_url: String,
    pub authorization_token: String,
}

/// A stored file version.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileInfo {
    pub file_id: String,
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LargeFile {
    file_id: String,
}

async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();

    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()));
    }

    let body = response.json::<ErrorBody>().await.unwrap_or_else(|_| ErrorBody {
        status: status.as_u16(),
        code: "unknown".to_owned(),
        message: status.to_string(),
    });

    Err(body.into())
}

async fn post_api<T: DeserializeOwned>(
    http: &Client,
    auth: &Authorization,
    operation: &str,
    body: serde_json::Value,
) -> Result<T, ApiError> {
    let url = format!("{}/b2api/v2/{}", auth.api_url, operation);

    let response = http
        .post(url)
        .header(AUTHORIZATION, &auth.authorization_token)
        .json(&body)
        .send()
        .await
        .map_err(ApiError::Transport)?;

    read_response(response).await
}

pub(crate) async fn authorize_account(
    http: &Client,
    url: &str,
    key_id: &str,
    application_key: &str,
) -> Result<Authorization, ApiError> {
    let response = http
        .get(url)
        .basic_auth(key_id, Some(application_key))
        .send()
        .await
        .map_err(ApiError::Transport)?;

    read_response(response).await
}

pub(crate) async fn get_upload_url(
    http: &Client,
    auth: &Authorization,
    bucket_id: &str,
) -> Result<UploadTarget, ApiError> {
    post_api(http, auth, "b2_get_upload_url", json!({ "bucketId": bucket_id })).await
}

pub(crate) async fn upload_file(
    http: &Client,
    target: &UploadTarget,
    file_name: &str,
    bytes: Bytes,
    sha1: &str,
) -> Result<FileInfo, ApiError> {
    let response = http
        .post(&target.upload_url)
        .header(AUTHORIZATION, &target.authorization_token)
        .header("X-Bz-File-Name", encode_file_name(file_name))
        .header(CONTENT_TYPE, "b2/x-auto")
        .header(CONTENT_LENGTH, bytes.len())
        .header("X-Bz-Content-Sha1", sha1)
        .body(bytes)
        .send()
        .await
        .map_err(ApiError::Transport)?;

    read_response(response).await
}

pub(crate) async fn start_large_file(
    http: &Client,
    auth: &Authorization,
    bucket_id: &str,
    file_name: &str,
) -> Result<String, ApiError> {
    let body = json!({
        "bucketId": bucket_id,
        "fileName": file_name,
        "contentType": "b2/x-auto",
    });

    let file: LargeFile = post_api(http, auth, "b2_start_large_file", body).await?;
    Ok(file.file_id)
}

pub(crate) async fn get_upload_part_url(
    http: &Client,
    auth: &Authorization,
    file_id: &str,
) -> Result<UploadTarget, ApiError> {
    post_api(http, auth, "b2_get_upload_part_url", json!({ "fileId": file_id })).await
}

pub(crate) async fn upload_part(
    http: &Client,
    target: &UploadTarget,
    part_number: u32,
    bytes: Bytes,
    sha1: &str,
) -> Result<(), ApiError> {
    let response = http
        .post(&target.upload_url)
        .header(AUTHORIZATION, &target.authorization_token)
        .header("X-Bz-Part-Number", part_number)
        .header(CONTENT_LENGTH, bytes.len())
        .header("X-Bz-Content-Sha1", sha1)
        .body(bytes)
        .send()
        .await
        .map_err(ApiError::Transport)?;

    read_response::<IgnoredAny>(response).await.map(|_| ())
}

pub(crate) async fn finish_large_file(
    http: &Client,
    auth: &Authorization,
    file_id: &str,
    part_sha1s: &[String],
) -> Result<FileInfo, ApiError> {
    let body = json!({ "fileId": file_id, "partSha1Array": part_sha1s });
    post_api(http, auth, "b2_finish_large_file", body).await
}

pub(crate) async fn cancel_large_file(
    http: &Client,
    auth: &Authorization,
    file_id: &str,
) -> Result<(), ApiError> {
    post_api::<IgnoredAny>(http, auth, "b2_cancel_large_file", json!({ "fileId": file_id }))
        .await
        .map(|_| ())
}

pub(crate) async fn delete_file_version(
    http: &Client,
    auth: &Authorization,
    file_name: &str,
    file_id: &str,
) -> Result<(), ApiError> {
    let body = json!({ "fileName": file_name, "fileId": file_id });
    post_api::<IgnoredAny>(http, auth, "b2_delete_file_version", body)
        .await
        .map(|_| ())
}

pub(crate) async fn hide_file(
    http: &Client,
    auth: &Authorization,
    bucket_id: &str,
    file_name: &str,
) -> Result<(), ApiError> {
    let body = json!({ "bucketId": bucket_id, "fileName": file_name });
    post_api::<IgnoredAny>(http, auth, "b2_hide_file", body)
        .await
        .map(|_| ())
}

/// Hex SHA-1 of a payload, as B2 expects in `X-Bz-Content-Sha1`.
pub(crate) fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Percent-encodes a file name for the `X-Bz-File-Name` header.
pub(crate) fn encode_file_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());

    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }

    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_file_names() {
        assert_eq!(encode_file_name("demos/c1/m-1.dem.bz2"), "demos/c1/m-1.dem.bz2");
        assert_eq!(encode_file_name("a b+c"), "a%20b%2Bc");
        assert_eq!(encode_file_name("é"), "%C3%A9");
    }

    #[test]
    fn sha1_matches_known_digest() {
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn expired_tokens_are_retryable() -> anyhow::Result<()> {
        let body: ErrorBody = serde_json::from_str(
            r#"{"status":401,"code":"expired_auth_token","message":"Authorization token has expired"}"#,
        )?;
        let err = ApiError::from(body);

        assert!(matches!(err, ApiError::Expired));
        assert!(err.is_retryable());
        assert!(StorageError::from(err).is_unavailable());
        Ok(())
    }

    #[test]
    fn other_errors_are_terminal() -> anyhow::Result<()> {
        let body: ErrorBody = serde_json::from_str(
            r#"{"status":400,"code":"bad_request","message":"sha1 did not match data received"}"#,
        )?;
        let err = ApiError::from(body);

        assert!(!err.is_retryable());
        assert!(matches!(
            StorageError::from(err),
            StorageError::Rejected { status: 400, .. }
        ));
        Ok(())
    }

    #[test]
    fn missing_files_are_detected() {
        assert!(is_missing_code("file_not_present"));
        assert!(!is_missing_code("bad_request"));
    }

    #[test]
    fn decodes_authorization() -> anyhow::Result<()> {
        let auth: Authorization = serde_json::from_str(
            r#"{
                "accountId": "acc",
                "authorizationToken": "token",
                "apiUrl": "https://api001.backblazeb2.com",
                "downloadUrl": "https://f001.backblazeb2.com",
                "recommendedPartSize": 100000000,
                "absoluteMinimumPartSize": 5000000
            }"#,
        )?;

        assert_eq!(auth.api_url, "https://api001.backblazeb2.com");
        assert_eq!(auth.recommended_part_size, Some(100_000_000));
        Ok(())
    }
}
