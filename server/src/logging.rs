//! Logger setup.

use env_logger::{Builder, Env};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn,launchpad_server=info,launchpad_curve_client=info";

/// Install the global logger, honouring `RUST_LOG` and falling back to
/// `default_filter`. Later calls are no-ops.
pub fn setup_with_default(default_filter: &str) {
    let _ = Builder::from_env(Env::new().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init();
}

pub fn setup() {
    setup_with_default(DEFAULT_FILTER);
}

/// Logger for tests: captured output, info level.
#[cfg(any(test, feature = "dev-context-only-utils"))]
pub fn init_test_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
