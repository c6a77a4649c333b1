//! # insightloop-logging
//!
//! Two channels of output for an interview:
//!
//! - [`Logger`] renders typed [`LogEvent`]s (session started, decision
//!   received, oracle fallback, transcript saved, ...) for the operator,
//!   optionally mirrored as JSON lines into a file.
//! - [`init_tracing`] installs the `tracing` subscriber used for library
//!   diagnostics. Both write to stderr so stdout stays free for command
//!   output such as `--json` results.

mod events;

pub use events::{LogEvent, LogFormat, Logger};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `level`. Calling this twice is harmless; the second
/// subscriber is not installed.
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
