//! Listing, fetching and read-marking endpoints.

use crate::{
  app::AppState,
  error::MailError,
  models::{email::ApiEmail, response::Confirmation},
  store::FilterHints,
};
use axum::{
  Json,
  extract::{
    Path as AxumPath, Query, State,
    rejection::{PathRejection, QueryRejection},
  },
};

/// `GET /emails?from=&to=&subject=`. Only the first non-empty hint in
/// from > to > subject order is applied.
pub async fn list_emails(
  State(state): State<AppState>,
  hints: Result<Query<FilterHints>, QueryRejection>,
) -> Result<Json<Vec<ApiEmail>>, MailError> {
  let Query(hints) = hints?;
  let rows = state.mail.list_messages(&hints.resolve()).await?;
  Ok(Json(rows.into_iter().map(ApiEmail::from).collect()))
}

/// `GET /email/:id`. Marks the email read as a side effect.
pub async fn get_email(
  State(state): State<AppState>,
  id: Result<AxumPath<i64>, PathRejection>,
) -> Result<Json<ApiEmail>, MailError> {
  let AxumPath(id) = id?;
  let email = state.mail.get_message(id).await?;
  Ok(Json(ApiEmail::from(email)))
}

/// `POST /email/:id/read`. Unknown ids still answer 200.
pub async fn mark_read(
  State(state): State<AppState>,
  id: Result<AxumPath<i64>, PathRejection>,
) -> Result<Json<Confirmation>, MailError> {
  let AxumPath(id) = id?;
  state.mail.mark_read(id).await?;
  Ok(Json(Confirmation::new("Email marked as read")))
}
