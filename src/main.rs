use clap::Parser;
use rangekeeper::ErrorKind;
use rangekeeper::OrchestratorError;
use rangekeeper::cli::{self, Cli};
use tracing::error;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rangekeeper=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(err) = cli::run(cli).await {
        // Exit codes mirror the transport classification: 2 for rejected
        // input, 3 for missing images/containers, 1 for everything else.
        let code = err
            .downcast_ref::<OrchestratorError>()
            .map(|e| match e.kind() {
                ErrorKind::BadRequest => 2,
                ErrorKind::NotFound => 3,
                ErrorKind::Internal => 1,
            })
            .unwrap_or(1);

        error!("{err:#}");
        std::process::exit(code);
    }
}
