/// Account Service Main Entry Point
///
/// Starts the HTTP server with:
/// - PostgreSQL connection pool (migrations applied at startup)
/// - Redis cache, or an in-process cache when `REDIS_URL` is unset
/// - SMS delivery via AWS SNS, or log-only delivery when `AWS_REGION` is unset
use account_service::{
    config::Settings,
    http::{self, AppState},
    security::{Argon2Hasher, TokenIssuer},
    services::{AccountDeps, AccountService, LogSmsSender, SmsSender, SnsSmsSender, SystemClock},
    PgCredentialStore,
};
use anyhow::{Context, Result};
use kv_cache::{KvCache, MemoryCache, RedisCache};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "account_service=info,audit=info,info".into()),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting account-service");

    let settings = Settings::load().context("Failed to load configuration")?;

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .acquire_timeout(Duration::from_secs(settings.database.acquire_timeout))
        .connect(&settings.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!(
        "Database pool initialized with {} max connections",
        settings.database.max_connections
    );

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations completed");

    let cache: Arc<dyn KvCache> = match &settings.redis {
        Some(redis) => {
            let cache = RedisCache::connect(&redis.url)
                .await
                .context("Failed to connect to Redis")?
                .with_op_timeout(redis.op_timeout());
            info!("Redis connection manager initialized");
            Arc::new(cache)
        }
        None => Arc::new(MemoryCache::new()),
    };

    let sms: Arc<dyn SmsSender> = if settings.sms.use_sns {
        let aws_config = aws_config::load_from_env().await;
        info!("SMS delivery via AWS SNS enabled");
        Arc::new(SnsSmsSender::new(
            aws_sdk_sns::Client::new(&aws_config),
            settings.sms.sender_id.clone(),
        ))
    } else {
        Arc::new(LogSmsSender)
    };

    let accounts = AccountService::new(
        AccountDeps {
            store: Arc::new(PgCredentialStore::new(db_pool.clone())),
            cache,
            sms,
            hasher: Arc::new(Argon2Hasher::new()),
            clock: Arc::new(SystemClock),
            tokens: TokenIssuer::new(&settings.jwt),
        },
        settings.auth.clone(),
    );
    let tasks = accounts.tasks().clone();

    let app = http::router(AppState::new(accounts));

    let bind_address = settings.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Account service listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    if !tasks.drain(settings.auth.side_effect_timeout()).await {
        info!(
            in_flight = tasks.in_flight(),
            "Abandoning background tasks still running at shutdown"
        );
    }

    db_pool.close().await;
    info!("Account service shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
