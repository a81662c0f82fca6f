//! Tracing subscriber setup for binaries embedding the service.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// ## Configuration
/// Respects `RUST_LOG`:
/// - `RUST_LOG=debug` - Show debug logs from all crates
/// - `RUST_LOG=meridian=trace` - Trace for meridian crates only
/// - Default: info, with meridian crates at debug and sqlx quieted
///
/// Call once at process startup; a second call is a no-op failure that is
/// deliberately swallowed (tests may race on the global subscriber).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,meridian=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
