//! Mapping of service errors to HTTP responses.

use crate::error::MailError;
use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ApiError {
  pub error: String,
}

impl IntoResponse for MailError {
  fn into_response(self) -> Response {
    let status = match &self {
      MailError::NotFound(_) => StatusCode::NOT_FOUND,
      MailError::Validation(_) => StatusCode::BAD_REQUEST,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
      error!("request failed: {self}");
    }
    (
      status,
      Json(ApiError {
        error: self.to_string(),
      }),
    )
      .into_response()
  }
}

// Extractor rejections become 400s with the usual JSON body.

impl From<JsonRejection> for MailError {
  fn from(e: JsonRejection) -> Self {
    MailError::Validation(e.body_text())
  }
}

impl From<PathRejection> for MailError {
  fn from(e: PathRejection) -> Self {
    MailError::Validation(e.body_text())
  }
}

impl From<QueryRejection> for MailError {
  fn from(e: QueryRejection) -> Self {
    MailError::Validation(e.body_text())
  }
}
