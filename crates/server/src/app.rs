use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::Config, db::Database, middleware, routes, services::storage::BlobStore};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub blobs: BlobStore,
}

pub fn build_router(state: AppState) -> Router {
    // Session-gated routes; project and task creation additionally check
    // the admin role inside the handler.
    let session_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        .route("/dashboard", get(routes::tasks::dashboard))
        .nest("/projects", routes::projects::router())
        .nest(
            "/tasks",
            routes::tasks::router()
                .merge(routes::comments::router())
                .merge(routes::files::router()),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    let api_router = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .merge(session_routes);

    let max_body = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        // Raw blob retrieval is public; there is no ownership check.
        .route("/uploads/:filename", get(routes::files::download))
        .nest("/api", api_router)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(DefaultBodyLimit::max(max_body))
}

async fn home() -> Redirect {
    Redirect::to("/api/auth/login")
}

async fn health_check() -> &'static str {
    "OK"
}
