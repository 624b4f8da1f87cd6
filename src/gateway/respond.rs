//! Response construction shared by the bridge handlers.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

/// Written verbatim when even the error envelope cannot be encoded.
const FALLBACK_ERROR_BODY: &str = r#"{"code": 500, "message": "Could not write response"}"#;

const ERROR_CONTENT_TYPE: &str = "application/json";
const REPLY_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const PUBLISH_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

/// JSON error envelope: `{"message": "..."}` under the caller's status.
pub(crate) fn error(status: StatusCode, message: String) -> Response {
    match serde_json::to_string(&ErrorBody { message }) {
        Ok(json) => (status, [(header::CONTENT_TYPE, ERROR_CONTENT_TYPE)], json).into_response(),
        Err(err) => {
            error!(error = %err, "Failed to encode error body");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, ERROR_CONTENT_TYPE)],
                FALLBACK_ERROR_BODY,
            )
                .into_response()
        }
    }
}

/// Pretty-printed JSON reply body. Replies are marked `nosniff` since the
/// payload inside is caller-controlled.
pub(crate) fn pretty_json<T: Serialize>(value: &T) -> Response {
    match serde_json::to_string_pretty(value) {
        Ok(json) => (
            [
                (header::CONTENT_TYPE, REPLY_CONTENT_TYPE),
                (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            ],
            json,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to encode reply body");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Empty-body acknowledgement for a fire-and-forget publish.
pub(crate) fn published() -> Response {
    ([(header::CONTENT_TYPE, PUBLISH_CONTENT_TYPE)], ()).into_response()
}
