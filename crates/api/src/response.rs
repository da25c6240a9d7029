//! Success envelope for API handlers.
//!
//! Every successful response is a JSON object carrying `"success": true`
//! next to the payload's own fields. Use [`Success`] instead of ad-hoc
//! `json!` bodies so payloads stay typed.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// `{ "success": true, ...T }`. `T` must serialize as a JSON object.
#[derive(Debug, Serialize)]
pub struct Success<T: Serialize> {
    success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> Success<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
