//! Router assembly
//!
//! The login route is mounted ungated; every model route sits behind the
//! auth gate via `route_layer`, so the gate only runs for paths that
//! actually match. Static routes win over `/{model}` in axum's matcher,
//! which is what keeps `POST /login` out of the model dispatcher.

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth_gate::auth_gate;
use super::handlers;
use super::host::GatewayHost;

pub fn build_router(host: Arc<GatewayHost>, custom_routes: Vec<Router>) -> Router {
    let login = Router::new().route(&host.config.auth.login_path, post(handlers::login));

    let models = Router::new()
        .route(
            "/{model}",
            get(handlers::read_collection).post(handlers::create_record),
        )
        .route(
            "/{model}/{id}",
            get(handlers::read_single)
                .patch(handlers::update_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )
        .route_layer(middleware::from_fn_with_state(host.clone(), auth_gate));

    let mut api = login.merge(models).with_state(host.clone());
    for routes in custom_routes {
        api = api.merge(routes);
    }
    let api = api.layer(cors_layer()).layer(TraceLayer::new_for_http());

    if host.config.mount_prefix.is_empty() {
        api
    } else {
        Router::new().nest(&host.config.mount_prefix, api)
    }
}

/// Browser clients must be able to read the token off the login response.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([AUTHORIZATION])
}
