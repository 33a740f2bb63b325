//! API server entry point.

use std::sync::Arc;

use api::auth::{AccessPolicy, AuthState, JwtManager};
use api::config::{Config, LogFormat};
use api::routes::{DynLimits, DynStore};
use saga::{HttpLimitServiceClient, InMemoryLimitService};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use transaction_store::{InMemoryTransactionStore, PostgresTransactionStore};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn connect_store(config: &Config) -> DynStore {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");
            let store = PostgresTransactionStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL transaction store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory transaction store");
            Arc::new(InMemoryTransactionStore::new())
        }
    }
}

fn connect_limits(config: &Config) -> DynLimits {
    match &config.limit_service_url {
        Some(url) => {
            let client = HttpLimitServiceClient::new(url.as_str(), config.limit_client_timeout)
                .expect("failed to build limit service client");
            tracing::info!(base_url = client.base_url(), "using remote limit service");
            Arc::new(client)
        }
        None => {
            tracing::warn!("LIMIT_SERVICE_URL not set, using in-memory limit service");
            Arc::new(InMemoryLimitService::new())
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Wire store, limit service and saga coordinator
    let store = connect_store(&config).await;
    let limits = connect_limits(&config);
    let state = api::create_state(store, limits, config.execution_mode);

    // 4. Build the application
    let auth = AuthState::new(
        JwtManager::new(&config.jwt_secret, config.jwt_duration),
        AccessPolicy::default_policy(),
    );
    let app = api::create_app(state, metrics_handle, auth);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, mode = %config.execution_mode, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
