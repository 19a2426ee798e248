//! Shared test helpers: one-time tracing setup and fixture documents.

use std::path::PathBuf;
use std::sync::Once;

use tracing_subscriber::{fmt, fmt::format::FmtSpan, prelude::*, EnvFilter};

static TEST_SETUP: Once = Once::new();

/// Installs the test subscriber once per test binary.
///
/// Honors `RUST_LOG`; defaults to `atdraw=debug` so rule rejections and
/// layout summaries show up in failing test output.
pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("atdraw=debug"));
        let layer = fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(filter);
        if let Err(e) = tracing_subscriber::registry().with(layer).try_init() {
            eprintln!("test logging already initialized: {e}");
        }
        tracing::debug!("test setup complete");
    });
}

/// Path of a document under `tests/resources`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/resources")
        .join(name)
}

/// Contents of a fixture document. Panics if it is missing.
pub fn read_fixture(name: &str) -> String {
    let path = fixture_path(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("fixture {}: {e}", path.display()))
}
