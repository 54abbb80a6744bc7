//! Direct submission.
//!
//! `POST /send-email` stores the posted email as if it had been delivered. It
//! does not transmit anything over SMTP.

use crate::{
  app::AppState,
  error::MailError,
  models::{email::SendRequest, response::Confirmation},
};
use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
};

pub async fn send_email(
  State(state): State<AppState>,
  payload: Result<Json<SendRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Confirmation>), MailError> {
  let Json(req) = payload?;
  let id = state.mail.submit_message(req).await?;
  Ok((
    StatusCode::CREATED,
    Json(Confirmation::with_id("Email sent successfully", id)),
  ))
}
