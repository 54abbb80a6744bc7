//! HTTP router and handlers.

use crate::app::AppState;
use axum::{
  Router,
  http::{Method, header},
  routing::{get, post},
};
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  trace::TraceLayer,
};

pub mod error;
pub mod messages;
pub mod send;

/// Assemble the HTTP router with all routes.
pub fn build_router(state: AppState) -> Router {
  Router::new()
    .route("/emails", get(messages::list_emails))
    .route("/email/:id", get(messages::get_email))
    .route("/email/:id/read", post(messages::mark_read))
    .route("/send-email", post(send::send_email))
    .layer(cors_layer())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Every origin is allowed, with credentials. The request origin is mirrored
/// because a wildcard origin cannot be combined with credentials.
fn cors_layer() -> CorsLayer {
  CorsLayer::new()
    .allow_origin(AllowOrigin::mirror_request())
    .allow_methods([
      Method::GET,
      Method::POST,
      Method::PUT,
      Method::DELETE,
      Method::OPTIONS,
    ])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    .allow_credentials(true)
}
