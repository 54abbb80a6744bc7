//! Utility functions: tracing and SQL pattern helpers.

use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is unset. sqlx logs every statement at info.
const DEFAULT_FILTER: &str = "info,sqlx=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
  Pretty,
  Compact,
}

impl LogFormat {
  fn from_env_value(value: Option<&str>) -> Self {
    match value.map(str::trim) {
      Some(v) if v.eq_ignore_ascii_case("compact") => LogFormat::Compact,
      _ => LogFormat::Pretty,
    }
  }
}

/// Install the global subscriber. `RUST_LOG` picks the filter and
/// `LOG_FORMAT=compact` switches to single-line output for log collectors.
pub fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
  let format = LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref());
  let builder = fmt().with_env_filter(filter).with_target(false);
  // A second call (tests, embedding) keeps the first subscriber.
  let _ = match format {
    LogFormat::Pretty => builder.pretty().try_init(),
    LogFormat::Compact => builder.compact().try_init(),
  };
}

/// Wrap `needle` in `%...%` for a `LIKE ... ESCAPE '\'` clause, escaping
/// wildcard characters so the needle matches literally.
pub fn contains_pattern(needle: &str) -> String {
  let mut out = String::with_capacity(needle.len() + 2);
  out.push('%');
  for c in needle.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}
