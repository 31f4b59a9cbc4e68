use std::sync::Arc;

use anyhow::Context;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};

use product_catalog as catalog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = catalog::config::load_config().context("failed to load configuration")?;
    catalog::config::init_tracing(cfg.log_level(), cfg.log_json);

    info!(
        git_hash = catalog::GIT_HASH,
        build_time = catalog::BUILD_TIME,
        environment = %cfg.environment,
        "Starting product catalog"
    );

    // Init DB
    let db_pool = catalog::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;
    catalog::db::check_connection(&db_pool)
        .await
        .context("database connectivity check failed")?;

    if cfg.auto_migrate {
        catalog::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    } else if !cfg.is_production() {
        warn!("auto_migrate disabled; expecting the products table to exist");
    }

    let db_arc = Arc::new(db_pool);
    let grpc_service = catalog::grpc::ProductGrpcService::new(catalog::product_service(
        db_arc.clone(),
    ));

    let addr = cfg.grpc_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind gRPC listener on {addr}"))?;
    catalog::grpc::serve(grpc_service, listener, shutdown_signal())
        .await
        .context("gRPC server failed")?;

    if let Ok(pool) = Arc::try_unwrap(db_arc) {
        if let Err(e) = catalog::db::close_pool(pool).await {
            warn!("Failed to close database pool cleanly: {}", e);
        }
    }

    info!("Product catalog shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
