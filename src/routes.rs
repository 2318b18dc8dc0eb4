use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::config::Config;
use crate::handlers;
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    // Contact form: public but rate limited per client IP
    let contact_routes = Router::new()
        .route("/api/contact", post(handlers::contact::send_contact))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_contact,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        // Authenticates through the token query parameter
        .route("/ws", get(handlers::ws::ws_handler))
        .merge(contact_routes);

    let protected_routes = Router::new()
        .route("/api/me", get(handlers::auth::me))
        // Measurements
        .route(
            "/api/measurements/:metric",
            post(handlers::measurements::create_measurement),
        )
        .route(
            "/api/measurements/:metric/history",
            get(handlers::measurements::get_history),
        )
        .route(
            "/api/measurements/:metric/history/stream",
            get(handlers::measurements::stream_history),
        )
        .route(
            "/api/measurements/:metric/:id",
            delete(handlers::measurements::delete_measurement),
        )
        // Calendar
        .route(
            "/api/calendar",
            get(handlers::calendar::list_events).post(handlers::calendar::create_event),
        )
        .route("/api/calendar/:id", delete(handlers::calendar::delete_event))
        // Profile
        .route(
            "/api/profile",
            get(handlers::profile::get_profile).patch(handlers::profile::update_profile),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = Vec::new();
    match config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => origins.push(origin),
        Err(_) => tracing::warn!(frontend_url = %config.frontend_url, "FRONTEND_URL is not a valid origin"),
    }
    // In dev, also allow LAN access (e.g. testing from another device)
    if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
        for o in extra.split(',') {
            if let Ok(hv) = o.trim().parse::<HeaderValue>() {
                origins.push(hv);
            }
        }
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
