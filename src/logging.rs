use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Set to `1` to emit JSON log lines instead of the compact format.
pub const ENV_LOG_JSON: &str = "FOOD_AESTHETICS_LOG_JSON";

const DEFAULT_FILTER: &str = "food_aesthetics=info,server=info,warn";

/// Installs the global tracing subscriber.  `RUST_LOG` overrides the default
/// filter.  Calling it twice is harmless; the second call is ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var(ENV_LOG_JSON).is_ok_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}
