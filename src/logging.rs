//! Tracing subscriber setup shared by the server and console binaries

use std::io::Write;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber writing to `writer`.
///
/// `RUST_LOG` wins over the configured level. The returned guard must be
/// held for the lifetime of the process so buffered lines get flushed.
pub fn init<W>(config: &LoggingConfig, writer: W) -> WorkerGuard
where
    W: Write + Send + 'static,
{
    let (non_blocking, guard) = tracing_appender::non_blocking(writer);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("book_inventory={},tower_http=debug", config.level).into()
    });

    let json = config.format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(non_blocking.clone())))
        .with((!json).then(|| fmt::layer().with_writer(non_blocking)))
        .init();

    guard
}
