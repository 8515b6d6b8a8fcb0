//! Public authentication API
//!
//! Endpoints:
//! - POST /auth/register - create a user
//! - POST /auth/login    - verify password, issue a token pair
//! - POST /auth/refresh  - rotate a session (Bearer access token + refresh token)

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info, warn};

use auth_token::{TokenPair, TokenService};

use crate::error::ApiError;
use crate::password;
use crate::users::{DirectoryError, UserDirectory};

/// Shared state for the public handlers.
#[derive(Clone)]
pub struct ApiState {
    pub tokens: Arc<TokenService>,
    pub users: Arc<dyn UserDirectory>,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Build the router for `/auth/*`.
pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .with_state(state)
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|_| ApiError::InvalidRequest("Invalid request payload"))
}

/// Extract the token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// POST /auth/register - 201 `{message, user_id}`.
async fn register(
    State(state): State<ApiState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Credentials { email, password } = parse_body(body)?;
    let email = email.trim().to_owned();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::InvalidRequest("Email and password are required"));
    }

    let hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| {
            error!(error = %e, "password hashing task failed");
            ApiError::Internal("Failed to hash password")
        })?
        .map_err(|e| {
            error!(error = %e, "password hashing failed");
            ApiError::Internal("Failed to hash password")
        })?;

    let user_id = match state.users.create(&email, &hash).await {
        Ok(id) => id,
        Err(DirectoryError::Conflict) => {
            return Err(ApiError::Conflict("Email already registered"));
        }
        Err(e) => {
            error!(error = %e, "user registration failed");
            return Err(ApiError::Internal("Registration failed"));
        }
    };

    info!(user_id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "User registered successfully",
            "user_id": user_id,
        })),
    ))
}

/// POST /auth/login - 200 `{access_token, refresh_token}`.
///
/// Unknown email and wrong password give the same 401.
async fn login(
    State(state): State<ApiState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<TokenPair>, ApiError> {
    let Credentials { email, password } = parse_body(body)?;

    let user = state
        .users
        .find_by_email(email.trim())
        .await
        .map_err(|e| {
            error!(error = %e, "user lookup failed");
            ApiError::Internal("Database error")
        })?
        .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    let stored_hash = user.password_hash;
    let matches =
        tokio::task::spawn_blocking(move || password::verify_password(&password, &stored_hash))
            .await
            .map_err(|e| {
                error!(error = %e, "password verification task failed");
                ApiError::Internal("Failed to verify password")
            })?;
    if !matches {
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    let pair = state.tokens.issue(user.id).await.map_err(|e| {
        error!(user_id = user.id, error = %e, "token issuance failed");
        ApiError::Internal("Failed to generate tokens")
    })?;

    info!(user_id = user.id, "login succeeded");
    Ok(Json(pair))
}

/// POST /auth/refresh - 200 with a new pair; the old session is gone.
async fn refresh(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, ApiError> {
    let RefreshRequest { refresh_token } = parse_body(body)?;

    let access_token = bearer_token(&headers).ok_or(ApiError::Unauthorized(
        "Authorization header (Bearer <access token>) required for refresh",
    ))?;

    match state.tokens.renew(access_token, &refresh_token).await {
        Ok(pair) => Ok(Json(pair)),
        Err(e) => {
            if !e.is_internal() {
                warn!(error = %e, "refresh rejected");
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use session_store::{MemorySessionStore, SessionStore};
    use tower::ServiceExt;

    use auth_token::SigningKey;

    use crate::users::MemoryUserDirectory;

    fn test_state() -> ApiState {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let key = SigningKey::new(b"api-test-key".to_vec()).unwrap();
        ApiState {
            tokens: Arc::new(TokenService::new(key, store)),
            users: Arc::new(MemoryUserDirectory::new()),
        }
    }

    fn json_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    fn refresh_request(access_token: Option<&str>, refresh_token: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/auth/refresh")
            .header("content-type", "application/json");
        if let Some(token) = access_token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder
            .body(Body::from(
                serde_json::json!({ "refresh_token": refresh_token }).to_string(),
            ))
            .unwrap()
    }

    async fn send(state: &ApiState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = build_api_router(state.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    async fn seed_user(state: &ApiState, email: &str, password: &str) -> i32 {
        let hash = password::hash_password(password).unwrap();
        state.users.create(email, &hash).await.unwrap()
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwdw==".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn register_creates_user() {
        let state = test_state();
        let (status, json) = send(
            &state,
            json_request(
                "/auth/register",
                r#"{"email":"ana@example.com","password":"pw-1"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["user_id"], 1);
        assert_eq!(json["message"], "User registered successfully");

        let user = state
            .users
            .find_by_email("ana@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(password::verify_password("pw-1", &user.password_hash));
    }

    #[tokio::test]
    async fn register_duplicate_email_is_409() {
        let state = test_state();
        seed_user(&state, "ana@example.com", "pw-1").await;

        let (status, json) = send(
            &state,
            json_request(
                "/auth/register",
                r#"{"email":"ana@example.com","password":"pw-2"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["type"], "conflict");
    }

    #[tokio::test]
    async fn register_rejects_bad_payloads() {
        let state = test_state();
        for body in [
            "not json",
            r#"{"email":"ana@example.com"}"#,
            r#"{"email":"","password":"pw"}"#,
            r#"{"email":"ana@example.com","password":""}"#,
        ] {
            let (status, json) = send(&state, json_request("/auth/register", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json["error"]["type"], "invalid_request");
        }
    }

    #[tokio::test]
    async fn login_issues_verifiable_pair() {
        let state = test_state();
        let user_id = seed_user(&state, "ana@example.com", "pw-1").await;

        let (status, json) = send(
            &state,
            json_request(
                "/auth/login",
                r#"{"email":"ana@example.com","password":"pw-1"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let access = json["access_token"].as_str().unwrap();
        assert!(!json["refresh_token"].as_str().unwrap().is_empty());
        let verification = state.tokens.verify(access).await;
        assert_eq!(verification.user_id(), Some(user_id));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let state = test_state();
        seed_user(&state, "ana@example.com", "pw-1").await;

        let (wrong_pw, wrong_pw_body) = send(
            &state,
            json_request(
                "/auth/login",
                r#"{"email":"ana@example.com","password":"nope"}"#,
            ),
        )
        .await;
        let (unknown, unknown_body) = send(
            &state,
            json_request(
                "/auth/login",
                r#"{"email":"bob@example.com","password":"pw-1"}"#,
            ),
        )
        .await;

        assert_eq!(wrong_pw, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_pw_body, unknown_body);
        assert_eq!(wrong_pw_body["error"]["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn refresh_rotates_session() {
        let state = test_state();
        let pair = state.tokens.issue(5).await.unwrap();

        let (status, json) = send(
            &state,
            refresh_request(Some(&pair.access_token), &pair.refresh_token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let new_access = json["access_token"].as_str().unwrap();
        assert_ne!(new_access, pair.access_token);
        assert_ne!(json["refresh_token"].as_str().unwrap(), pair.refresh_token);
        assert!(state.tokens.verify(new_access).await.is_valid());
        assert!(!state.tokens.verify(&pair.access_token).await.is_valid());
    }

    #[tokio::test]
    async fn refresh_replay_is_401() {
        let state = test_state();
        let pair = state.tokens.issue(5).await.unwrap();

        let (first, _) = send(
            &state,
            refresh_request(Some(&pair.access_token), &pair.refresh_token),
        )
        .await;
        let (second, json) = send(
            &state,
            refresh_request(Some(&pair.access_token), &pair.refresh_token),
        )
        .await;

        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["message"], "Session expired or revoked");
    }

    #[tokio::test]
    async fn refresh_with_wrong_credential_revokes() {
        let state = test_state();
        let pair = state.tokens.issue(5).await.unwrap();

        let (status, json) = send(
            &state,
            refresh_request(Some(&pair.access_token), "guessed-refresh-token"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["message"], "Invalid refresh token");

        // The legitimate holder is locked out too
        let (status, _) = send(
            &state,
            refresh_request(Some(&pair.access_token), &pair.refresh_token),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(!state.tokens.verify(&pair.access_token).await.is_valid());
    }

    #[tokio::test]
    async fn refresh_requires_bearer_header() {
        let state = test_state();
        let pair = state.tokens.issue(5).await.unwrap();

        let (status, json) = send(&state, refresh_request(None, &pair.refresh_token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(
            json["error"]["message"]
                .as_str()
                .unwrap()
                .contains("Authorization header")
        );

        // Session untouched by the rejected attempt
        assert!(state.tokens.verify(&pair.access_token).await.is_valid());
    }

    #[tokio::test]
    async fn refresh_with_malformed_access_token_is_401() {
        let state = test_state();
        let (status, json) = send(&state, refresh_request(Some("garbage"), "whatever")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["message"], "Invalid access token structure");
    }

    #[tokio::test]
    async fn refresh_with_bad_body_is_400() {
        let state = test_state();
        let request = Request::builder()
            .method("POST")
            .uri("/auth/refresh")
            .header("content-type", "application/json")
            .header("authorization", "Bearer x.y.z")
            .body(Body::from("{}"))
            .unwrap();
        let (status, _) = send(&state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
