use std::net::SocketAddr;
use std::sync::Arc;

use gatehouse_api::config::ServerConfig;
use gatehouse_api::router::build_app_router;
use gatehouse_api::state::AppState;
use gatehouse_caddy::admin::CaddyAdmin;
use gatehouse_pipeline::caddy::{CaddyApplier, CaddyfileParser};
use gatehouse_pipeline::hosts::HostService;
use gatehouse_pipeline::import::ImportService;
use gatehouse_pipeline::pg::{PgImportSessionStore, PgProxyHostStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "gatehouse_api=debug,gatehouse_pipeline=debug,tower_http=debug".into()
    });
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        caddy_admin_url = %config.caddy_admin_url,
        import_dir = %config.import_dir.display(),
        "Loaded server configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = gatehouse_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    gatehouse_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    gatehouse_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Services ---
    let host_store = Arc::new(PgProxyHostStore::new(pool.clone()));
    let session_store = Arc::new(PgImportSessionStore::new(pool.clone()));
    let admin = CaddyAdmin::new(config.caddy_admin_url.clone());
    match admin.get_config().await {
        Ok(_) => tracing::info!(admin_url = %admin.admin_url(), "Caddy admin API reachable"),
        Err(e) => tracing::warn!(
            admin_url = %admin.admin_url(),
            error = %e,
            "Caddy admin API unreachable; live config pushes will fail until it is up",
        ),
    }
    let applier = Arc::new(CaddyApplier::new(admin));

    let hosts = Arc::new(HostService::new(host_store.clone(), applier.clone()));
    let imports = Arc::new(ImportService::new(
        config.import_config(),
        session_store,
        host_store,
        Arc::new(CaddyfileParser),
        applier,
    ));

    if let Err(e) = imports.detect_on_start().await {
        tracing::error!(error = %e, "Startup import detection failed");
    }

    // --- App state ---
    let state = AppState {
        pool: Some(pool),
        config: Arc::new(config.clone()),
        imports,
        hosts,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
