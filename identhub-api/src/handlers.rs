//! HTTP API handlers

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::types::*;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use identhub_core::core_directory::DirectoryRecord;
use identhub_core::core_identity::IdentityAnnouncement;
use identhub_core::health::HealthCheck;
use identhub_core::{SamlUser, TokenVerification};
use serde_json::Value;
use tracing::info;

// ============================================================================
// Health
// ============================================================================

/// GET /health - Component health; 503 when a component is unhealthy
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthCheck>) {
    let session = state.session.read().await;
    let report = state.health.check(&session, state.store.as_ref()).await;
    let status = StatusCode::from_u16(report.status.to_http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(report))
}

// ============================================================================
// Identity and directory
// ============================================================================

/// GET /identity/:alias - Verified alias announcement
pub async fn get_identity(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> ApiResult<Json<IdentityAnnouncement>> {
    let session = state.session.read().await;
    session
        .directory()
        .resolve_alias(&alias)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("identity {}", alias)))
}

/// GET /directory/:public_key - Verified directory record
pub async fn get_directory(
    State(state): State<AppState>,
    Path(public_key): Path<String>,
) -> ApiResult<Json<DirectoryRecord>> {
    let session = state.session.read().await;
    session
        .directory()
        .lookup(&public_key)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("directory record {}", public_key)))
}

// ============================================================================
// Verification
// ============================================================================

/// POST /verify - Check a signature under a caller-supplied key
pub async fn verify_signature(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Json<VerifyResponse> {
    let session = state.session.read().await;
    let valid = session.verify(req.message.as_bytes(), &req.signature, &req.public_key);
    Json(VerifyResponse { valid })
}

/// POST /token/verify - 200 with claims, or 401 with the failure code
pub async fn verify_token(
    State(state): State<AppState>,
    Json(req): Json<TokenVerifyRequest>,
) -> (StatusCode, Json<TokenVerification>) {
    let session = state.session.read().await;
    let report = session.tokens().verification(&req.token);
    let status = if report.valid { StatusCode::OK } else { StatusCode::UNAUTHORIZED };
    (status, Json(report))
}

// ============================================================================
// Raw store access
// ============================================================================

/// PUT /dht/*key
pub async fn dht_put(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> ApiResult<StatusCode> {
    state.store.put(&key, value).await.map_err(identhub_core::HubError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /dht/*key
pub async fn dht_get(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .store
        .get(&key)
        .await
        .map_err(identhub_core::HubError::from)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("key {}", key)))
}

// ============================================================================
// SAML
// ============================================================================

/// GET /saml/metadata - IdP metadata for the live signing key
pub async fn saml_metadata(State(state): State<AppState>) -> ApiResult<Response> {
    let session = state.session.read().await;
    let xml = session.federation(&state.config.saml).metadata()?;
    Ok(([(header::CONTENT_TYPE, "application/samlmetadata+xml")], xml).into_response())
}

/// GET /saml/sso - HTTP-Redirect binding
pub async fn saml_sso_redirect(
    State(state): State<AppState>,
    Query(params): Query<SsoParams>,
) -> ApiResult<Html<String>> {
    sso(&state, params).await
}

/// POST /saml/sso - HTTP-POST binding
pub async fn saml_sso_post(
    State(state): State<AppState>,
    Form(params): Form<SsoParams>,
) -> ApiResult<Html<String>> {
    sso(&state, params).await
}

async fn sso(state: &AppState, params: SsoParams) -> ApiResult<Html<String>> {
    let saml_request = params
        .saml_request
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("SAMLRequest is required".to_string()))?;
    let token = params
        .token
        .as_deref()
        .ok_or_else(|| ApiError::Unauthorized("SSO requires a token".to_string()))?;
    let token: Value = serde_json::from_str(token)
        .map_err(|e| ApiError::Unauthorized(format!("token is not JSON: {}", e)))?;

    let session = state.session.read().await;
    let federation = session.federation(&state.config.saml);
    let user = federation.user_for_token(&token).await?;

    let outcome = federation.sso(saml_request, &user, params.relay_state.as_deref())?;
    info!(
        request_id = %outcome.request.id,
        sp = %outcome.request.issuer,
        subject = %outcome.response.assertion.assertion.name_id,
        "SSO response issued"
    );
    Ok(Html(outcome.form))
}

/// POST /saml/test-assertion - Signed assertion for an arbitrary profile
pub async fn saml_test_assertion(
    State(state): State<AppState>,
    Json(req): Json<TestAssertionRequest>,
) -> ApiResult<Json<TestAssertionResponse>> {
    let session = state.session.read().await;
    let federation = session.federation(&state.config.saml);

    let target = identhub_core::ServiceProviderTarget::new(req.acs_url, req.audience);
    let signed = federation.assertion_for(
        &SamlUser::from_profile(&req.user),
        &target,
        req.in_response_to.as_deref(),
    )?;

    Ok(Json(TestAssertionResponse { xml: signed.signed_xml.clone(), assertion: signed }))
}
