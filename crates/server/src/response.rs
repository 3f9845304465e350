//! JSON response construction.

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Content type of every response the service produces.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Serializes `body` into a response with the JSON content type and an exact
/// `Content-Length`.
///
/// Serialization failures produce a bare 500, never a panic.
pub fn json_response<T>(status: StatusCode, body: &T) -> Response
where
    T: Serialize + ?Sized,
{
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        },
    };

    let content_length = HeaderValue::from(bytes.len());
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(header::CONTENT_LENGTH, content_length);
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn sets_headers_and_body() {
        let response = json_response(StatusCode::OK, &json!({ "accessToken": "é" }));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], JSON_CONTENT_TYPE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], r#"{"accessToken":"é"}"#.as_bytes());
    }

    #[test]
    fn content_length_counts_bytes_not_characters() {
        let response = json_response(StatusCode::OK, &json!({ "v": "é" }));
        // `{"v":"é"}` is 9 characters but 10 bytes.
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "10");
    }
}
