use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout and the terminal stream carry modem traffic.
pub fn init_tracing() {
    // RUST_LOG=vmodem_core=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .compact()
        .try_init();
}
