pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Json, Router,
    http::HeaderValue,
    routing::{get, post, put},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors(&state.settings.app.cors_origins);

    let user_routes = Router::new()
        .route("/", post(routes::user::create))
        .route("/staff", get(routes::user::staff))
        .route("/manager", get(routes::user::managers))
        .route("/transfer-target", get(routes::user::transfer_targets))
        .route("/{user_id}/active", put(routes::user::set_active));

    let lead_routes = Router::new()
        .route("/", get(routes::lead::list).post(routes::lead::create))
        .route("/{lead_id}", get(routes::lead::get))
        .route("/{lead_id}/status", put(routes::lead::update_status))
        .route("/{lead_id}/transfer", post(routes::lead::transfer))
        .route("/{lead_id}/note", post(routes::lead::add_note))
        .route("/{lead_id}/activity", get(routes::lead::activity));

    let task_routes = Router::new()
        .route("/", get(routes::task::list).post(routes::task::create))
        .route("/today", get(routes::task::today))
        .route("/{task_id}", get(routes::task::get))
        .route("/{task_id}/complete", post(routes::task::complete));

    let target_routes = Router::new()
        .route("/", put(routes::target::set))
        .route("/stats", get(routes::target::stats));

    let report_routes = Router::new()
        .route("/staff", get(routes::report::staff))
        .route("/call", get(routes::report::calls))
        .route("/lead", get(routes::report::leads));

    let leave_routes = Router::new()
        .route("/", get(routes::leave::list).post(routes::leave::apply))
        .route("/{leave_id}/status", put(routes::leave::update_status));

    let api = Router::new()
        .route("/health", get(health))
        .route("/me", get(routes::user::me))
        .route("/me/device", put(routes::user::register_device))
        .route("/customer", get(routes::customer::find_by_phone))
        .route("/activity", get(routes::activity::list))
        .route("/notification", get(routes::notification::list))
        .nest("/user", user_routes)
        .nest("/lead", lead_routes)
        .nest("/task", task_routes)
        .nest("/target", target_routes)
        .nest("/report", report_routes)
        .nest("/leave", leave_routes);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
