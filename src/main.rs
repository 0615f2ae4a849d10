use tracing_subscriber::prelude::*;

fn main() {
    // Logs go to stderr; stdout carries the tree.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "uastify=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    uastify::cli::run();
}
