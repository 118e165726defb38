use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

/// Installs the global tracing subscriber for a worker process.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. Installing twice
/// is tolerated so embedding callers and tests can set up their own
/// subscriber first.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = SubscriberBuilder::default().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
