use tracing_subscriber::{EnvFilter, prelude::*};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` sets the level for the workspace crates (default `info`);
/// everything else stays at `warn`.
pub fn init_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},callbot={level},utils={level},place_call={level},publish_tunnel={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();
}
