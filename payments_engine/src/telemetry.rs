use tracing_subscriber::EnvFilter;

/// `tracing_subscriber` bootstrap shared by both binaries. Unlike the
/// teacher's single bare `FmtSubscriber::builder()`, this is `EnvFilter`
/// driven so the `api` and `worker` binaries can be given independent
/// verbosity via `RUST_LOG` without a code change.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
