use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/identity/:alias", get(handlers::get_identity))
        .route("/directory/:public_key", get(handlers::get_directory))
        .route("/verify", post(handlers::verify_signature))
        .route("/token/verify", post(handlers::verify_token))
        .route("/dht/*key", get(handlers::dht_get).put(handlers::dht_put))
        .route("/saml/metadata", get(handlers::saml_metadata))
        .route(
            "/saml/sso",
            get(handlers::saml_sso_redirect).post(handlers::saml_sso_post),
        )
        .route("/saml/test-assertion", post(handlers::saml_test_assertion))
        .with_state(state)
}
