use crate::config::LogFormat;
use crate::logging::encoder::CloudEncoder;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

mod encoder;
mod log_message;

const DEFAULT_LEVEL: &str = "info";

/// Install the global subscriber. `RUST_LOG` overrides the default level.
pub fn logger_setup(format: LogFormat) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .event_format(CloudEncoder::new())
                    .with_writer(std::io::stdout),
            )
            .try_init(),
        LogFormat::Plain => registry.with(fmt::layer().with_ansi(false)).try_init(),
    }
}
