//! Logging setup for binaries and integration tests.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.  `RUST_LOG` overrides the
/// default filter.  Call once per process; later calls are ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("confab_sync=debug,confab_net=debug,confab_store=info,warn")
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
