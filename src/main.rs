use club_portal::catalog::Catalog;
use club_portal::config::AppConfig;
use club_portal::http::middleware::rate_limit::RateLimitState;
use club_portal::http::router::build_router;
use club_portal::processor::mock::MockProcessor;
use club_portal::processor::stripe::StripeProcessor;
use club_portal::processor::CheckoutProcessor;
use club_portal::repo::members_repo::MembersRepo;
use club_portal::repo::orders_repo::OrdersRepo;
use club_portal::repo::payments_repo::PaymentsRepo;
use club_portal::repo::registrations_repo::RegistrationsRepo;
use club_portal::repo::waiver_acceptances_repo::WaiverAcceptancesRepo;
use club_portal::service::checkout_service::CheckoutService;
use club_portal::service::notifier::Notifier;
use club_portal::service::reconciliation_service::ReconciliationService;
use club_portal::service::waiver_service::WaiverService;
use club_portal::AppState;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let catalog = Arc::new(match &cfg.catalog_path {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::builtin()?,
    });
    tracing::info!(
        events = catalog.events.len(),
        licenses = catalog.licenses.len(),
        products = catalog.products.len(),
        source = cfg.catalog_path.as_deref().unwrap_or("builtin"),
        "catalog loaded"
    );

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let http_client = reqwest::Client::new();
    let processor: Arc<dyn CheckoutProcessor> = match cfg.payment_processor.as_str() {
        "mock" => Arc::new(MockProcessor::new(&cfg.mock_processor_behavior, &cfg.public_base_url)),
        "stripe" => {
            if cfg.stripe_secret_key.is_empty() {
                tracing::warn!("STRIPE_SECRET_KEY is empty; checkout sessions will fail");
            }
            Arc::new(StripeProcessor {
                base_url: cfg.stripe_base_url.clone(),
                secret_key: cfg.stripe_secret_key.clone(),
                timeout_ms: cfg.processor_timeout_ms,
                client: http_client.clone(),
            })
        }
        other => anyhow::bail!("unknown PAYMENT_PROCESSOR {other}"),
    };

    let payments_repo = PaymentsRepo { pool: pool.clone() };
    let members_repo = MembersRepo { pool: pool.clone() };
    let registrations_repo = RegistrationsRepo { pool: pool.clone() };
    let orders_repo = OrdersRepo { pool: pool.clone() };
    let acceptances_repo = WaiverAcceptancesRepo { pool: pool.clone() };

    let notifier = Notifier {
        client: http_client,
        api_url: cfg.mail_api_url.clone(),
        api_key: cfg.mail_api_key.clone(),
        from: cfg.mail_from.clone(),
        timeout_ms: cfg.processor_timeout_ms,
    };

    let state = AppState {
        pool: pool.clone(),
        redis_client: redis::Client::open(cfg.redis_url.clone())?,
        waiver_service: WaiverService {
            catalog: catalog.clone(),
            acceptances_repo: acceptances_repo.clone(),
            members_repo: members_repo.clone(),
            registrations_repo: registrations_repo.clone(),
        },
        checkout_service: CheckoutService {
            pool: pool.clone(),
            catalog: catalog.clone(),
            processor: processor.clone(),
            members_repo: members_repo.clone(),
            currency: cfg.currency.clone(),
            membership_fee_minor: cfg.membership_fee_minor,
            public_base_url: cfg.public_base_url.clone(),
        },
        reconciliation_service: ReconciliationService {
            pool: pool.clone(),
            catalog,
            processor: processor.clone(),
            payments_repo: payments_repo.clone(),
            members_repo,
            registrations_repo,
            orders_repo,
            notifier,
            webhook_secret: cfg.stripe_webhook_secret.clone(),
        },
        payments_repo,
        acceptances_repo,
    };

    let rate_limit = RateLimitState {
        redis_client: redis::Client::open(cfg.redis_url.clone())?,
        max_per_minute: cfg.rate_limit_per_minute,
        trust_forwarded_for: cfg.trust_forwarded_for,
    };
    let app = build_router(state, cfg.internal_api_key.clone(), Some(rate_limit));

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(processor = processor.name(), "listening on {}", cfg.bind_addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
    tracing::info!("shutdown signal received");
}
