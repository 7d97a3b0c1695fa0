//! Shared setup for integration tests

use tracing_subscriber::EnvFilter;

/// Route pipeline logs through the test harness; set `RUST_LOG` to see them
#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
