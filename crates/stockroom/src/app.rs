use std::time::Duration;

use axum::{
    http::{header, Method, StatusCode},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use stockroom_core::record::{Channel, Location, Record};

use crate::{
    handlers::{health::ping, records},
    state::AppState,
};

/// Create the application router with all routes and middleware.
///
/// The locked upsert sleeps per unit, so the request timeout stays generous.
pub fn create_app(state: AppState) -> Router {
    // CORS configuration for API endpoints
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .nest(&format!("/{}", Channel::KIND), records::routes::<Channel>())
        .nest(&format!("/{}", Location::KIND), records::routes::<Location>())
        .layer(cors);

    Router::new()
        .route("/ping", get(ping))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(300),
        ))
        .with_state(state)
}
