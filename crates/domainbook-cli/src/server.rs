//! HTTP front end for the directory store.
//!
//! Handlers are thin: they move the request onto the blocking pool, call the
//! matching `DirectoryRepo` operation and shape the JSON or CSV response.
//! Errors are returned as `{"detail": ...}` bodies.
//!
//! The CSV export needs a bearer token: one issued by `POST /token` to a user
//! registered through `POST /register`, or the static token from the config.

use anyhow::{Context as _, Result};
use axum::extract::{Path as AxumPath, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use domainbook_store::credentials::{constant_time_eq, random_token, sha256_hex, CredentialStore};
use domainbook_store::error::{StoreError, StoreErrorKind};
use domainbook_store::export::{banded_csv_string, EXPORT_FILENAME};
use domainbook_store::Store;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub export_token: Option<String>,
    pub allowed_origins: Vec<String>,
}

struct AppState {
    store: Store,
    credentials: Arc<dyn CredentialStore>,
    tokens: TokenRegistry,
    /// SHA-256 of the configured static token, compared in constant time.
    export_token_digest: Option<String>,
}

/// Tokens handed out by `POST /token`, keyed by their SHA-256 so the raw
/// values never sit in memory after issuance. Lives as long as the server.
#[derive(Debug, Default)]
struct TokenRegistry {
    issued: Mutex<HashMap<String, String>>,
}

impl TokenRegistry {
    fn issue(&self, email: &str) -> domainbook_store::error::Result<String> {
        let token = random_token()?;
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sha256_hex(&token), email.to_string());
        Ok(token)
    }

    fn holder(&self, digest: &str) -> Option<String> {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(digest)
            .cloned()
    }
}

#[derive(Debug, Deserialize)]
struct EmailInput {
    email: String,
}

#[derive(Debug, Deserialize)]
struct RegisterInput {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct TokenBody {
    access_token: String,
    token_type: &'static str,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    message: &'static str,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err.kind() {
            StoreErrorKind::InvalidFormat => {
                Self::new(StatusCode::BAD_REQUEST, "Invalid email format")
            }
            StoreErrorKind::DomainMismatch => {
                Self::new(StatusCode::BAD_REQUEST, "Email domain mismatch")
            }
            StoreErrorKind::DuplicateEntry => {
                Self::new(StatusCode::BAD_REQUEST, "Email already exists")
            }
            StoreErrorKind::NotFound => Self::new(StatusCode::NOT_FOUND, "Email not found"),
            StoreErrorKind::UserExists => Self::new(StatusCode::BAD_REQUEST, "User already exists"),
            StoreErrorKind::EmptyPassword => {
                Self::new(StatusCode::BAD_REQUEST, "Password cannot be empty")
            }
            StoreErrorKind::InvalidCredentials => {
                Self::new(StatusCode::UNAUTHORIZED, "Incorrect username or password")
            }
            _ => {
                error!(error = %err, "directory storage failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage failure")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub async fn serve(store: Store, config: ServeConfig) -> Result<()> {
    if !config.bind.ip().is_loopback() {
        warn!(bind = %config.bind, "registration is open on a non-loopback address");
    }

    let app = router(store, &config);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    info!(addr = %listener.local_addr()?, "serving directory API");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| "server failed")?;
    info!("server stopped");
    Ok(())
}

pub fn router(store: Store, config: &ServeConfig) -> Router {
    let credentials = Arc::new(store.credentials());
    router_with(store, credentials, config)
}

pub fn router_with(
    store: Store,
    credentials: Arc<dyn CredentialStore>,
    config: &ServeConfig,
) -> Router {
    let state = Arc::new(AppState {
        store,
        credentials,
        tokens: TokenRegistry::default(),
        export_token_digest: config.export_token.as_deref().map(sha256_hex),
    });

    Router::new()
        .route("/", get(welcome))
        .route("/register", post(register))
        .route("/token", post(issue_token))
        .route("/domains", get(list_domains))
        .route("/emails/:domain", get(list_emails))
        .route("/emails/:domain/add", post(add_email))
        .route("/emails/:domain/delete", post(delete_email))
        .route("/download_csv", get(download_csv))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_DISPOSITION]);
    if origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    cors.allow_origin(allowed)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

async fn with_store<T, F>(state: Arc<AppState>, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> domainbook_store::error::Result<T> + Send + 'static,
{
    with_state(state, move |state| op(&state.store)).await
}

async fn with_state<T, F>(state: Arc<AppState>, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> domainbook_store::error::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&state))
        .await
        .map_err(|err| {
            error!(error = %err, "store task panicked");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage failure")
        })?
        .map_err(ApiError::from)
}

fn authorize(headers: &HeaderMap, state: &AppState) -> Result<(), ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Missing bearer token"));
    };
    let presented = value
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default();
    let digest = sha256_hex(presented);

    if let Some(expected) = state.export_token_digest.as_deref() {
        if constant_time_eq(digest.as_bytes(), expected.as_bytes()) {
            debug!("export authorized by configured token");
            return Ok(());
        }
    }
    if let Some(user) = state.tokens.holder(&digest) {
        debug!(user = %user, "export authorized");
        return Ok(());
    }
    Err(ApiError::new(StatusCode::UNAUTHORIZED, "Invalid bearer token"))
}

async fn welcome() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the Email Group Viewer API!" }))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(input): Json<RegisterInput>,
) -> Result<Json<MessageBody>, ApiError> {
    with_state(state, move |state| {
        state.credentials.register(&input.email, &input.password)
    })
    .await?;
    Ok(Json(MessageBody {
        message: "User registered successfully",
    }))
}

async fn issue_token(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenBody>, ApiError> {
    let access_token = with_state(state, move |state| {
        let user = state.credentials.authenticate(&form.username, &form.password)?;
        state.tokens.issue(user.as_str())
    })
    .await?;
    Ok(Json(TokenBody {
        access_token,
        token_type: "bearer",
    }))
}

async fn list_domains(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    let domains = with_store(state, |store| store.directory().list_domains()).await?;
    Ok(Json(domains))
}

async fn list_emails(
    State(state): State<Arc<AppState>>,
    AxumPath(domain): AxumPath<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let emails = with_store(state, move |store| store.directory().list_emails(&domain)).await?;
    Ok(Json(emails))
}

async fn add_email(
    State(state): State<Arc<AppState>>,
    AxumPath(domain): AxumPath<String>,
    Json(input): Json<EmailInput>,
) -> Result<Json<MessageBody>, ApiError> {
    with_store(state, move |store| {
        store.directory().add_email(&domain, &input.email)
    })
    .await?;
    Ok(Json(MessageBody {
        message: "Email added successfully",
    }))
}

async fn delete_email(
    State(state): State<Arc<AppState>>,
    AxumPath(domain): AxumPath<String>,
    Json(input): Json<EmailInput>,
) -> Result<Json<MessageBody>, ApiError> {
    with_store(state, move |store| {
        store.directory().delete_email(&domain, &input.email)
    })
    .await?;
    Ok(Json(MessageBody {
        message: "Email deleted successfully",
    }))
}

async fn download_csv(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    authorize(&headers, &state)?;
    let csv = with_store(state, |store| {
        let rows = store.directory().export_grouped()?;
        banded_csv_string(&rows)
    })
    .await?;
    let disposition = format!("attachment; filename={EXPORT_FILENAME}");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::{router, router_with, ServeConfig};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use domainbook_store::credentials::{CredentialStore, FileCredentialStore};
    use domainbook_store::Store;
    use serde_json::Value;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_config(export_token: Option<&str>) -> ServeConfig {
        ServeConfig {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            export_token: export_token.map(str::to_string),
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }

    fn test_app(temp: &TempDir, export_token: Option<&str>) -> Router {
        let store = Store::open(&temp.path().join("contacts.csv")).expect("open store");
        router(store, &test_config(export_token))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, body.to_vec())
    }

    fn post_email(uri: &str, email: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "email": email }).to_string()))
            .expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request")
    }

    fn register(email: &str, password: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "email": email, "password": password }).to_string(),
            ))
            .expect("request")
    }

    fn login(username: &str, password: &str) -> Request<Body> {
        let username = username.replace('@', "%40");
        Request::builder()
            .method("POST")
            .uri("/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={username}&password={password}")))
            .expect("request")
    }

    fn json(body: &[u8]) -> Value {
        serde_json::from_slice(body).expect("json body")
    }

    #[tokio::test]
    async fn add_then_list_round_trip() {
        let temp = TempDir::new().expect("temp dir");
        let app = test_app(&temp, None);

        let (status, body) = send(&app, post_email("/emails/example.com/add", "A@Example.com ")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["message"], "Email added successfully");

        let (status, body) = send(&app, get("/emails/example.com")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body), serde_json::json!(["a@example.com"]));

        let (_, body) = send(&app, get("/domains")).await;
        assert_eq!(json(&body), serde_json::json!(["example.com"]));
    }

    #[tokio::test]
    async fn add_errors_are_bad_requests() {
        let temp = TempDir::new().expect("temp dir");
        let app = test_app(&temp, None);

        let (status, body) = send(&app, post_email("/emails/example.com/add", "nope")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["detail"], "Invalid email format");

        let (status, body) = send(&app, post_email("/emails/foo.com/add", "x@bar.com")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["detail"], "Email domain mismatch");

        send(&app, post_email("/emails/bar.com/add", "x@bar.com")).await;
        let (status, body) = send(&app, post_email("/emails/bar.com/add", "X@BAR.com")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["detail"], "Email already exists");
    }

    #[tokio::test]
    async fn delete_missing_email_is_not_found() {
        let temp = TempDir::new().expect("temp dir");
        let app = test_app(&temp, None);
        send(&app, post_email("/emails/example.com/add", "ada@example.com")).await;

        let (status, body) = send(&app, post_email("/emails/example.com/delete", "ada@example.com")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["message"], "Email deleted successfully");

        let (status, body) = send(&app, post_email("/emails/example.com/delete", "ada@example.com")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(&body)["detail"], "Email not found");
    }

    #[tokio::test]
    async fn download_csv_is_banded_attachment() {
        let temp = TempDir::new().expect("temp dir");
        let app = test_app(&temp, Some("s3cret"));
        for (domain, email) in [("z.com", "b@z.com"), ("y.com", "a@y.com"), ("z.com", "c@z.com")] {
            send(&app, post_email(&format!("/emails/{domain}/add"), email)).await;
        }

        let response = app
            .clone()
            .oneshot(get_with_bearer("/download_csv", "s3cret"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=emails.csv"
        );
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(
            String::from_utf8(body.to_vec()).expect("utf8"),
            "Domain,Email\ny.com,\n,a@y.com\nz.com,\n,b@z.com\n,c@z.com\n"
        );
    }

    #[tokio::test]
    async fn download_csv_requires_configured_token() {
        let temp = TempDir::new().expect("temp dir");
        let app = test_app(&temp, Some("s3cret"));

        let (status, _) = send(&app, get("/download_csv")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        for wrong in ["nope", "s3cre", "s3cret ", "S3CRET", ""] {
            let (status, _) = send(&app, get_with_bearer("/download_csv", wrong)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "token {wrong:?}");
        }

        let (status, body) = send(&app, get_with_bearer("/download_csv", "s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"Domain,Email\n");
    }

    #[tokio::test]
    async fn download_csv_is_closed_without_any_token() {
        let temp = TempDir::new().expect("temp dir");
        let app = test_app(&temp, None);

        let (status, body) = send(&app, get("/download_csv")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json(&body)["detail"], "Missing bearer token");

        let (status, _) = send(&app, get_with_bearer("/download_csv", "anything")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn registered_user_token_unlocks_export() {
        let temp = TempDir::new().expect("temp dir");
        let app = test_app(&temp, None);
        send(&app, post_email("/emails/example.com/add", "ada@example.com")).await;

        let (status, body) = send(&app, register("Ada@Example.com", "hunter2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["message"], "User registered successfully");

        let (status, body) = send(&app, login("ada@example.com", "hunter2")).await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["token_type"], "bearer");
        let token = body["access_token"].as_str().expect("token").to_string();

        let (status, body) = send(&app, get_with_bearer("/download_csv", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"Domain,Email\nexample.com,\n,ada@example.com\n");
    }

    #[tokio::test]
    async fn register_and_login_errors() {
        let temp = TempDir::new().expect("temp dir");
        let app = test_app(&temp, None);
        send(&app, register("ada@example.com", "hunter2")).await;

        let (status, body) = send(&app, register("ada@example.com", "other")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["detail"], "User already exists");

        let (status, body) = send(&app, register("nope", "pw")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["detail"], "Invalid email format");

        let (status, body) = send(&app, register("bob@example.com", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["detail"], "Password cannot be empty");

        for (username, password) in [("ada@example.com", "wrong"), ("bob@example.com", "hunter2")] {
            let (status, body) = send(&app, login(username, password)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(json(&body)["detail"], "Incorrect username or password");
        }
    }

    #[tokio::test]
    async fn credential_store_is_injected() {
        let temp = TempDir::new().expect("temp dir");
        let store = Store::open(&temp.path().join("contacts.csv")).expect("open store");
        let credentials = Arc::new(FileCredentialStore::new(temp.path().join("elsewhere.json")));
        credentials
            .register("ada@example.com", "hunter2")
            .expect("register");
        let app = router_with(store, credentials, &test_config(None));

        let (status, _) = send(&app, login("ada@example.com", "hunter2")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!temp.path().join("contacts.csv.users.json").exists());
    }

    #[tokio::test]
    async fn welcome_route_answers() {
        let temp = TempDir::new().expect("temp dir");
        let app = test_app(&temp, None);
        let (status, body) = send(&app, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json(&body)["message"].as_str().expect("message").contains("Welcome"));
    }
}
