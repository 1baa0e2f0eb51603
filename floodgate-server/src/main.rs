mod config;
mod http;
mod lifecycle;
mod movies;
mod notify;
mod supervisor;
mod throttle;

use anyhow::Result;

use crate::config::Config;
use crate::http::AppState;
use crate::lifecycle::Coordinator;
use crate::movies::MovieStore;
use crate::notify::Notifier;
use crate::supervisor::TaskSupervisor;
use crate::throttle::ThrottleActor;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("floodgate={}", config.log_level).parse()?),
        )
        .init();

    // The throttle registry gets a single owner; everyone else talks to it
    // through the handle.
    let throttle = ThrottleActor::spawn(&config.limiter);
    let supervisor = TaskSupervisor::new();

    let state = AppState {
        throttle,
        supervisor: supervisor.clone(),
        movies: MovieStore::new(),
        notifier: Notifier::new(),
        env: config.env.clone(),
    };
    let app = http::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        addr = %addr,
        env = %config.env,
        limiter_enabled = config.limiter.enabled,
        "starting server"
    );

    let coordinator = Coordinator::new(supervisor, config.shutdown.clone());
    coordinator
        .serve(listener, app, lifecycle::shutdown_signal())
        .await?;

    tracing::info!("server stopped");

    Ok(())
}
