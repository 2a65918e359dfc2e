//! Structured logging setup.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::{LogFormat, LoggingSettings};

fn env_filter(default_level: &str) -> EnvFilter {
	EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(default_level))
		.unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Calling this
/// more than once keeps the first subscriber.
pub fn init_logging(settings: &LoggingSettings) {
	let filter = env_filter(&settings.level);
	let registry = tracing_subscriber::registry().with(filter);

	let result = match settings.format {
		LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
		LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
		LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
	};

	if result.is_ok() {
		tracing::debug!(level = %settings.level, format = ?settings.format, "Logging initialized");
	}
}

static TEST_LOGGING: Once = Once::new();

/// Route log output through the test harness' captured writer
pub fn init_test_logging() {
	TEST_LOGGING.call_once(|| {
		let _ = tracing_subscriber::registry()
			.with(env_filter("warn"))
			.with(fmt::layer().with_test_writer())
			.try_init();
	});
}
