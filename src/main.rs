const USAGE: &str = "\
Usage: mailstash [--version | --help]

Runs the SMTP sink and the JSON API. Settings come from the environment:
  DATABASE_URL             sqlite:... or postgres://...; overrides DB_*
  DB_HOST, DB_PORT         postgres host and port (localhost, 5432)
  DB_USER, DB_PASSWORD     postgres credentials (postgres, postgres)
  DB_NAME                  postgres database (mailserver)
  DB_MAX_CONNECTIONS       pool size (5)
  PORT                     HTTP API port (8080)
  SMTP_ADDR                SMTP listen address (0.0.0.0:1025)
  SMTP_DOMAIN              name announced in the greeting (localhost)
  SMTP_MAX_MESSAGE_BYTES   data block limit (1048576)
  SMTP_MAX_RECIPIENTS      recipients per message (50)
  SMTP_READ_TIMEOUT_SECS   idle read timeout (10)
  SMTP_WRITE_TIMEOUT_SECS  reply write timeout (10)
  RUST_LOG                 log filter (info)
  LOG_FORMAT               pretty or compact (pretty)";

#[tokio::main]
async fn main() {
  match std::env::args().nth(1).as_deref() {
    Some("--version" | "-V") => println!("mailstash {}", env!("CARGO_PKG_VERSION")),
    Some("--help" | "-h") => println!("{USAGE}"),
    Some(other) => {
      eprintln!("unknown argument: {other}\n\n{USAGE}");
      std::process::exit(2);
    }
    None => {
      if let Err(e) = mailstash::app::run().await {
        eprintln!("mailstash: {e}");
        std::process::exit(1);
      }
    }
  }
}
