use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use hireup_api::AppState;
use hireup_gateway::{connection, Broker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hireup=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("HIREUP_DB_PATH").unwrap_or_else(|_| "hireup.db".into());
    let host = std::env::var("HIREUP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("HIREUP_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Arc::new(hireup_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let broker = Broker::new();
    let state = AppState::new(db, broker);

    // Routes
    let app = Router::new()
        .merge(hireup_api::router(state.clone()))
        .merge(
            Router::new()
                .route("/ws", get(ws_upgrade))
                .with_state(state),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Hireup server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Deserialize)]
struct WsQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.broker, state.db, query.session_id)
    })
}
