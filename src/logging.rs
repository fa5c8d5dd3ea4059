//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a `-v` count: 0 → info, 1 → debug, 2+ → trace.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "tes_seasonal_control=info",
        1 => "tes_seasonal_control=debug",
        _ => "tes_seasonal_control=trace",
    }
}

/// Installs a stderr fmt subscriber. `RUST_LOG` overrides the verbosity default.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
