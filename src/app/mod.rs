//! Application setup and runtime.

use crate::{config::Config, http, service::MailService, smtp, store};
use std::net::SocketAddr;
use tracing::{error, info};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
  pub mail: MailService,
}

/// Start HTTP and SMTP servers with configured environment.
pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
  crate::util::init_tracing();

  let config = Config::from_env()?;
  let store = store::connect(&config.database).await?;
  info!("database initialized");

  let state = AppState {
    mail: MailService::new(store.clone()),
  };
  let app = http::build_router(state);

  // Start SMTP listener in background
  let smtp_config = config.smtp.clone();
  tokio::spawn(async move {
    if let Err(e) = smtp::start_smtp(store, smtp_config).await {
      error!("smtp listener error: {e}");
    }
  });

  let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
  info!("api server:           http://{}/emails", addr);
  info!("direct submission:    POST http://{}/send-email", addr);

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app).await?;
  Ok(())
}
