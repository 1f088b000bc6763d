//! Logging setup with env-filter support

use tracing_subscriber::EnvFilter;

/// Initialize tracing output for the binary.
///
/// Respects `RUST_LOG`; defaults to `smartfind=info` when unset. Logs go to
/// stderr so poll output on stdout stays machine-readable.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("smartfind=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
