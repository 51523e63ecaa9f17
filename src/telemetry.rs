//! Telemetry initialization.
//!
//! Controlled by `ARCHON_LOG`: unset defaults to `info`; otherwise parsed as
//! a standard `tracing-subscriber` `EnvFilter` directive (e.g.
//! `archon=debug,archon_git=warn`). Always writes structured JSON to stderr
//! so logs compose with the CLI's own stdout payloads.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Initialize the global tracing subscriber.
///
/// Safe to call once per process; a second call is a no-op warning rather
/// than a panic, since CLI entry points and tests may both attempt it.
pub fn init() {
    let filter = EnvFilter::try_from_env("ARCHON_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
        )
        .try_init();

    if let Err(e) = result {
        eprintln!("warning: tracing subscriber already initialized: {e}");
    }
}
