mod error;
mod fanout;
mod push;
mod state;
mod util;

pub mod protocol;
pub mod routes;

pub use error::{ApiError, ErrorResponse};
pub use fanout::{ChannelRegistry, Dispatcher};
pub use push::PushClient;
pub use state::AppState;

use axum::{
    http::header::{AUTHORIZATION, CONTENT_TYPE},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        // Room routes
        .route("/api/chat/room", post(routes::rooms::create_room))
        .route("/api/chat/rooms", get(routes::rooms::list_rooms))
        .route("/api/chat/room/:room_id/info", get(routes::rooms::room_info))
        .route("/api/chat/room/:room_id/read", post(routes::rooms::mark_read))
        // Message routes
        .route("/api/chat/history/:room_id", get(routes::messages::history))
        .route(
            "/api/chat/room/:room_id/message",
            post(routes::messages::send_message),
        )
        .route(
            "/api/chat/room/:room_id/image",
            post(routes::messages::upload_image),
        )
        // Push device registration
        .route("/api/push/token", post(routes::push_tokens::register_token))
        // WebSocket route
        .route("/ws", get(routes::websocket::websocket_handler))
        .with_state(state)
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
