//! `junction run` — start the load balancer.
//!
//! Loads and validates the configuration, resolves every target group
//! (DNS happens once, here), spawns the health supervisors, and serves
//! the Axum listener until a shutdown signal arrives. Shutdown is
//! cooperative: in-flight requests finish within their timeout and
//! each supervisor is joined with a bounded wait.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::config;
use crate::error::JunctionError;
use crate::logging;
use crate::server::{self, AppState};

pub async fn execute(args: RunArgs) -> Result<(), JunctionError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let path = config::resolve_path(args.config.as_deref())?;
    let mut config = config::load_file(&path)?;

    // CLI port override wins over the config file
    if let Some(port) = args.port {
        config.listener.port = port;
    }

    let state = Arc::new(AppState::from_config(&config).await?);
    let supervisors = state.spawn_supervisors();

    let router = server::build_router(Arc::clone(&state), args.max_body);

    let addr: SocketAddr = format!("{}:{}", args.host, state.settings.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        groups = state.groups.len(),
        rules = state.rules.len(),
        supervisors = supervisors.len(),
        "junction started"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    for supervisor in supervisors {
        supervisor.shutdown().await;
    }

    tracing::info!("junction stopped");
    Ok(())
}
