use tracing::debug;
use tracing_subscriber::{EnvFilter, prelude::*};

/// Initialize tracing for tests with error span capture.
///
/// Output goes through the test writer so it is only shown for failing
/// tests. `RUST_LOG` overrides the default `cassandra_client=debug` filter.
///
/// Safe to call from every test: later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cassandra_client=debug,test_utils=debug"));

    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_test_writer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false),
        )
        .with(tracing_error::ErrorLayer::default())
        .with(filter)
        .try_init();

    if result.is_err() {
        // Already initialized by an earlier test in this binary
        debug!("Tracing already initialized, skipping re-initialization");
    }
}
