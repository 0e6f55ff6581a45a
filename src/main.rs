use payment_dispatch::config::AppConfig;
use payment_dispatch::gateways::registry::{GatewayDeps, GatewayRegistry};
use payment_dispatch::http::routes::build_router;
use payment_dispatch::repo::audit_repo::{AuditRepo, AuditStore, InMemoryAuditStore};
use payment_dispatch::service::audit_logger::AuditLogger;
use payment_dispatch::service::payment_service::PaymentService;
use payment_dispatch::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let store: Arc<dyn AuditStore> = match cfg.database_url.as_deref() {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            Arc::new(AuditRepo { pool })
        }
        None => {
            tracing::warn!("DATABASE_URL not set; audit entries are kept in memory");
            Arc::new(InMemoryAuditStore::new())
        }
    };

    let audit = Arc::new(AuditLogger::new(cfg.payment.audit.clone(), store));
    let deps = GatewayDeps {
        client: reqwest::Client::builder().build()?,
        audit,
    };
    let registry = GatewayRegistry::from_config(&cfg.payment, &deps)?;
    tracing::info!(
        default_gateway = registry.default_gateway(),
        gateways = ?registry.available_gateways(),
        "gateway registry ready"
    );

    let state = AppState {
        payment_service: PaymentService::new(Arc::new(registry)),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(addr = %cfg.bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
