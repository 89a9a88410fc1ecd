//! Replaces the original's module-load-time `logging.basicConfig` with
//! explicit `tracing_subscriber` setup, called once from `main`.

pub fn init(debug: bool) {
    let filter = if debug {
        "netfuse=debug,netfuse_protocol=debug"
    } else {
        "netfuse=info,netfuse_protocol=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();
}
