use anyhow::Result;
use reports_dashboard::{
    auth::{auth0::Auth0Provider, helpers::create_http_client, AuthProviders, SessionStore},
    reports::SupabaseReportStore,
    web, AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often expired sessions are swept from the store
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting reports dashboard");

    // Load configuration from environment
    let config = reports_dashboard::config::Config::load()?;
    tracing::info!(
        environment = ?config.environment,
        public_url = %config.public_url,
        supabase_url = %config.supabase_url,
        "Configuration loaded"
    );

    // One outbound client for the identity provider and the data store
    let http_client = create_http_client(
        config.http_connect_timeout_secs,
        config.http_request_timeout_secs,
    )
    .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

    let auth0 = Auth0Provider::new(&config, http_client.clone())
        .map_err(|e| anyhow::anyhow!("Failed to initialize Auth0 provider: {}", e))?;
    let providers = AuthProviders::new().register(Arc::new(auth0));
    tracing::info!(providers = ?providers.ids(), "Identity providers registered");

    let reports = SupabaseReportStore::new(
        http_client,
        &config.supabase_url,
        &config.supabase_anon_key,
    );

    let sessions = Arc::new(SessionStore::new());
    spawn_session_sweeper(sessions.clone());

    // Create shared application state
    let state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        providers,
        sessions,
        reports: Arc::new(reports),
    });

    let app = web::create_router(state);

    // Bind and serve
    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Reports dashboard listening on {}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_session_sweeper(sessions: Arc<SessionStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sessions.purge_expired().await;
            if removed > 0 {
                tracing::debug!(removed, "Expired sessions purged");
            }
        }
    });
}
