/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "tube_vault=info,tauri=info";

/// Install the global tracing subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    init_tracing_with(None);
}

/// Same as [`init_tracing`] with a level taken from the config file
pub fn init_tracing_with(log_level: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match log_level {
            Some(level) => format!("tube_vault={level},tauri=info").into(),
            None => DEFAULT_LOG_FILTER.into(),
        }
    });

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
