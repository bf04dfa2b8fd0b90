pub mod audit;
pub mod config;
pub mod dto;
pub mod error;
pub mod i18n;
pub mod models;
pub mod response;
pub mod sequence;
pub mod services;
pub mod state;
pub mod storage;
pub mod store;

/// Installs the default fmt subscriber; safe to call more than once.
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,commerce_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
