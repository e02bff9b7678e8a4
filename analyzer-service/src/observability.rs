use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "warn,charge_analyzer=info";

/// Install the global `fmt` subscriber.
///
/// A non-empty `RUST_LOG` replaces the default directives entirely.
pub fn init_tracing() {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(DEFAULT_DIRECTIVES),
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
