//! Multi-room Axum server for the coin drawing party game.
//!
//! # Routes
//!
//! | Method | Path                          | Description                        |
//! |--------|-------------------------------|------------------------------------|
//! | `GET`  | `/`                           | Serve the static web frontend      |
//! | `GET`  | `/ws`                         | Room subscription stream           |
//! | `GET`  | `/api/coins`                  | Shuffled coin catalog              |
//! | `POST` | `/api/rooms`                  | Create a room                      |
//! | `POST` | `/api/rooms/join`             | Join a room by code                |
//! | `POST` | `/api/rooms/{code}/start`     | Host: start the round              |
//! | `POST` | `/api/rooms/{code}/next-round`| Host: next round (resets players)  |
//! | `POST` | `/api/rooms/{code}/lobby`     | Host: back to lobby                |
//! | `POST` | `/api/rooms/{code}/leave`     | Remove own player row              |
//! | `POST` | `/api/rooms/{code}/submit`    | Submit a drawing                   |
//! | `POST` | `/api/upload`                 | Store an image, return a reference |
//! | `POST` | `/api/delete-room`            | Origin-gated room deletion         |
//! | `GET`  | `/drawings/*`                 | Stored drawings                    |
//!
//! Configuration via environment: `PORT` (default 8080), `STATIC_DIR`
//! (frontend build, default `./dist`), `DATA_DIR` (drawing storage, default
//! `./data`), `ALLOWED_ORIGINS` (comma-separated allow-list for
//! `delete-room`).

mod api;
mod rooms;
mod store;
mod upload;
mod ws_handler;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::EnvFilter;

use rooms::RoomCoordinator;
use store::RoomStore;
use upload::DrawingStore;

/// Shared application state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<RoomCoordinator>,
    pub store: Arc<RoomStore>,
    pub drawings: Arc<DrawingStore>,
    pub allowed_origins: Arc<Vec<String>>,
}

#[tokio::main]
async fn main() {
    // Initialise tracing (respects RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
    let allowed_origins: Vec<String> = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();

    let store = Arc::new(RoomStore::new());
    let drawings = Arc::new(DrawingStore::new(&data_dir));
    let state = AppState {
        coordinator: Arc::new(RoomCoordinator::new(Arc::clone(&store))),
        store,
        drawings: Arc::clone(&drawings),
        allowed_origins: Arc::new(allowed_origins),
    };

    // Static file directory for the web frontend build.
    let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| "./dist".to_string());

    // Serve the SPA: try static files first, fall back to index.html for
    // client-side routing.
    let serve_spa = ServeDir::new(&static_dir)
        .not_found_service(ServeFile::new(format!("{static_dir}/index.html")));

    let app = Router::new()
        .route("/ws", get(ws_route))
        .route("/api/coins", get(api::coins))
        .route("/api/rooms", post(api::create_room))
        .route("/api/rooms/join", post(api::join_room))
        .route("/api/rooms/{code}/start", post(api::start_round))
        .route("/api/rooms/{code}/next-round", post(api::next_round))
        .route("/api/rooms/{code}/lobby", post(api::back_to_lobby))
        .route("/api/rooms/{code}/leave", post(api::leave_room))
        .route("/api/rooms/{code}/submit", post(api::submit_drawing))
        .route("/api/upload", post(api::upload))
        .route("/api/delete-room", post(api::delete_room))
        .nest_service("/drawings", ServeDir::new(drawings.root()))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .fallback_service(serve_spa);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Coinsketch server listening on {addr}");
    tracing::info!("Serving static files from {static_dir}, drawings from {data_dir}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/// `GET /ws` — upgrade and hand off to [`ws_handler::handle_socket`].
async fn ws_route(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_handler::handle_socket(socket, state.store))
}
