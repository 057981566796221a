use axum::{
    http::{header, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod engine;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to specific origins in production

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        // Auth endpoints (mixed: some public, some protected)
        .nest("/auth", auth_routes(app_state.clone()))
        // Protected endpoints (require JWT)
        .nest(
            "/decks",
            deck_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .nest(
            "/flashcard",
            flashcard_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .nest(
            "/test",
            full_test_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .nest(
            "/daily-test",
            daily_test_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .nest(
            "/stats",
            stats_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .nest(
            "/admin",
            admin_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn auth_routes(
    app_state: std::sync::Arc<services::AppState>,
) -> Router<std::sync::Arc<services::AppState>> {
    let public_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::get_current_user))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ));

    public_routes.merge(protected_routes)
}

fn deck_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/", get(handlers::decks::list_decks))
        .route("/{id}", get(handlers::decks::get_deck))
        .route("/{id}/mark-viewed", patch(handlers::decks::mark_viewed))
}

fn flashcard_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/start/{deck_id}", post(handlers::flashcards::start_session))
        .route("/next/{session_id}", get(handlers::flashcards::next_card))
        .route("/answer", post(handlers::flashcards::submit_answer))
}

fn full_test_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/start", post(handlers::full_tests::start_test))
        .route("/answer", post(handlers::full_tests::submit_answer))
        .route("/submit/{attempt_id}", post(handlers::full_tests::submit_test))
        .route("/result/{attempt_id}", get(handlers::full_tests::get_result))
        .route("/history", get(handlers::full_tests::history))
}

fn daily_test_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/start", post(handlers::daily_tests::start_today))
        .route("/answer", post(handlers::daily_tests::submit_answer))
        .route("/submit/{attempt_id}", post(handlers::daily_tests::submit_test))
        .route("/{date}", get(handlers::daily_tests::get_for_date))
}

fn stats_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new().route("/me", get(handlers::stats::my_stats))
}

fn admin_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/questions/import", post(handlers::admin::import_questions))
        .route("/bank/stats", get(handlers::admin::bank_stats))
        .route_layer(middleware::from_fn(
            middlewares::auth::admin_guard_middleware,
        ))
}
