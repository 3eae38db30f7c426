use dealroom::{
    api, config::Config, DealApi, DealStore, HttpDealApi, StaticToken, StoreConfig, Uploader,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        eprintln!("Server error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let tokens = match config.session_token.clone() {
        Some(token) => StaticToken::new(token),
        None => StaticToken::none(),
    };
    let deal_api: Arc<dyn DealApi> = Arc::new(HttpDealApi::with_timeouts(
        config.deal_api_url.clone(),
        Arc::new(tokens),
        config.request_timeout,
        config.upload_timeout,
    ));

    let store = DealStore::new(deal_api.clone(), StoreConfig::from(&config));
    let uploader = Uploader::new(deal_api, store.clone());

    // First load runs in the background so the server is reachable immediately
    let session_store = store.clone();
    let session_user = config.session_user_id.clone();
    tokio::spawn(async move {
        session_store.initialize(session_user).await;
    });

    let state =
        api::AppState::new(store.clone(), uploader).with_max_upload_bytes(config.max_upload_bytes);
    let app = api::create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind to {}: {}", addr, e))?;

    tracing::info!(
        "Serving deals from {} on {}",
        config.deal_api_url,
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    store.dispose();
    tracing::info!("Shut down");
    Ok(())
}
