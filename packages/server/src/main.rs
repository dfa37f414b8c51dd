use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use common::judge::judge0::Judge0Client;
use tracing::{Level, info};

use server::config::AppConfig;
use server::database::init_db;
use server::seed;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = init_db(&config.database.url).await?;
    seed::seed_role_permissions(&db).await?;
    seed::ensure_indexes(&db).await?;

    let judge = Judge0Client::new(
        config.judge.url.clone(),
        config.judge.api_key.clone(),
        Duration::from_secs(config.judge.timeout_secs),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState {
        db,
        config: Arc::new(config),
        judge: Arc::new(judge),
    };

    let app = server::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
