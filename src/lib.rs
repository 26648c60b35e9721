pub mod api;
pub mod config;
pub mod pipeline;

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::ValidatorConfig;
use crate::pipeline::validation::GroundingValidator;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Entry point for the `medsum` binary: serve the validation API until Ctrl-C.
pub fn run() -> ExitCode {
    init_tracing();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ValidatorConfig::from_env();
    tracing::info!(
        model = %config.model,
        api_configured = config.has_api_key(),
        "Validator configured"
    );

    let addr: SocketAddr = match config::bind_addr().parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid bind address: {e}");
            return ExitCode::FAILURE;
        }
    };

    // The blocking HTTP client owns its own runtime, so it is built and
    // dropped outside the tokio runtime below.
    let validator = match GroundingValidator::anthropic(config) {
        Ok(validator) => Arc::new(validator),
        Err(e) => {
            tracing::error!("Failed to build API client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(serve_until_ctrl_c(Arc::clone(&validator), addr));
    drop(runtime);
    drop(validator);

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn serve_until_ctrl_c(
    validator: Arc<GroundingValidator>,
    addr: SocketAddr,
) -> Result<(), String> {
    let mut server = api::start_api_server(validator, addr).await?;
    tracing::info!(
        session_id = %server.session.session_id,
        addr = %server.session.server_addr,
        "Listening"
    );

    let signal = tokio::signal::ctrl_c().await;
    server.shutdown();
    server.stopped().await;

    signal.map_err(|e| format!("Failed to listen for Ctrl-C: {e}"))
}
