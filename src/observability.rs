use tracing_subscriber::EnvFilter;

/// Honor `RUST_LOG` verbatim when set; otherwise default to info-level
/// logging for this crate only, keeping dependency noise out of scrapes.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("shelly_exporter=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
