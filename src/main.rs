//! Creator Billing service
//!
//! ## REST Endpoints
//!
//! - `POST /api/webhooks/stripe` - Provider event intake
//! - `GET /api/subscriptions/:creator_id` - The caller's subscription
//! - `POST /api/subscriptions/:creator_id/cancel` - Cancel at period end
//! - `POST /api/subscriptions/:creator_id/reactivate` - Withdraw a scheduled cancellation
//! - `GET /health` - Liveness probe
//!
//! ## Background tasks
//!
//! - Notification dispatcher (drains the outbox)
//! - Ledger retention (prunes old processed-event ids)

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use creator_billing::adapters::events::{LedgerRetentionTask, NotificationDispatcher};
use creator_billing::adapters::http::{app_router, BillingAppState};
use creator_billing::adapters::notifications::LoggingNotificationSender;
use creator_billing::adapters::postgres::{
    PostgresCreatorPricing, PostgresNotificationOutbox, PostgresProcessedEventLedger,
    PostgresSubscriptionRepository, MIGRATOR,
};
use creator_billing::adapters::rate_limiter::{InMemoryRateLimiter, RedisRateLimiter};
use creator_billing::adapters::stripe::StripePaymentAdapter;
use creator_billing::config::{AppConfig, LogFormat, RateLimitBackend, ServerConfig};
use creator_billing::ports::{NotificationOutbox, ProcessedEventLedger, RateLimiter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.server)?;
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        bind_address = %config.server.bind_address,
        rate_limit_backend = ?config.rate_limit.backend,
        "Starting creator billing service"
    );

    // Database
    let pool = config.database.connect().await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        "Database pool created"
    );

    if config.database.run_migrations {
        MIGRATOR.run(&pool).await?;
        tracing::info!("Migrations applied");
    }

    // Adapters
    let ledger: Arc<dyn ProcessedEventLedger> =
        Arc::new(PostgresProcessedEventLedger::new(pool.clone()));
    let outbox: Arc<dyn NotificationOutbox> =
        Arc::new(PostgresNotificationOutbox::new(pool.clone()));

    let rate_limiter: Arc<dyn RateLimiter> = match config.rate_limit.backend {
        RateLimitBackend::Memory => Arc::new(InMemoryRateLimiter::new(config.rate_limit.limits())),
        RateLimitBackend::Redis => {
            let url = config.rate_limit.redis_url.as_deref().unwrap_or_default();
            Arc::new(RedisRateLimiter::connect(url, config.rate_limit.limits()).await?)
        }
    };

    let webhook_verifier = config.payment.webhook_verifier().map(Arc::new);
    if webhook_verifier.is_none() {
        tracing::warn!("No webhook signing secret configured; webhooks will be refused");
    }

    let state = BillingAppState {
        subscription_repository: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        processed_event_ledger: ledger.clone(),
        creator_pricing: Arc::new(PostgresCreatorPricing::new(pool.clone())),
        payment_provider: Arc::new(StripePaymentAdapter::new(config.payment.stripe_config())),
        notification_outbox: outbox.clone(),
        rate_limiter,
        webhook_verifier,
    };

    // Background tasks
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let dispatcher = NotificationDispatcher::with_config(
        outbox,
        Arc::new(LoggingNotificationSender::new()),
        config.notifications.dispatcher_config(),
    );
    let dispatcher_shutdown = shutdown_rx.clone();
    let dispatcher_handle = tokio::spawn(async move { dispatcher.run(dispatcher_shutdown).await });

    let retention = LedgerRetentionTask::new(
        ledger,
        config.ledger.retention_days,
        config.ledger.sweep_interval(),
    );
    let retention_handle = tokio::spawn(async move { retention.run(shutdown_rx).await });

    // HTTP server
    let app = app_router(state, config.server.request_timeout());
    let addr = config.server.bind_address;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop background tasks and let them drain
    let _ = shutdown_tx.send(true);
    let drain = async {
        for handle in [dispatcher_handle, retention_handle] {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Background task panicked");
            }
        }
    };
    if tokio::time::timeout(config.server.shutdown_grace(), drain)
        .await
        .is_err()
    {
        tracing::warn!("Background tasks did not stop within the grace period");
    }
    pool.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(server: &ServerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&server.log_level))?;

    let registry = tracing_subscriber::registry().with(filter);
    match server.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?,
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
