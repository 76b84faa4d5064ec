use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::errors::AppError;
use crate::workflow::{token, Workflow};

pub mod handlers;
pub mod pages;
pub mod session;

use session::SessionKeys;

/// Form posts are small; anything larger is refused before parsing.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub workflow: Workflow,
    pub sessions: SessionKeys,
    pub config: Config,
}

impl AppState {
    pub fn new(workflow: Workflow, config: Config) -> Self {
        let sessions = SessionKeys::new(&config.session_secret, config.secure_cookies);
        Self {
            workflow,
            sessions,
            config,
        }
    }

    pub fn is_admin(&self, headers: &axum::http::HeaderMap) -> bool {
        self.sessions.admin_from_headers(headers).is_some()
    }
}

/// Build the full application router with its middleware stack.
pub fn router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/delete/:id", post(handlers::delete_request))
        .route("/clear-all", post(handlers::clear_all))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/", get(handlers::index))
        .route("/submit", post(handlers::submit))
        .route("/status", get(handlers::status))
        .route("/approve/:token", get(handlers::approve))
        .route("/disapprove/:token", get(handlers::disapprove))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/healthz", get(|| async { "ok" }))
        .merge(admin)
        .fallback(fallback_404)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
            tracing::debug_span!(
                "request",
                method = %req.method(),
                path = %loggable_path(req.uri().path()),
            )
        }))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
}

/// Request path with the token of an approve/disapprove link redacted.
/// Query strings are never included.
pub fn loggable_path(path: &str) -> String {
    for prefix in ["/approve/", "/disapprove/"] {
        if let Some(token) = path.strip_prefix(prefix) {
            return format!("{}{}", prefix, token::redact(token));
        }
    }
    path.to_string()
}

async fn fallback_404() -> (StatusCode, axum::response::Html<String>) {
    (
        StatusCode::NOT_FOUND,
        pages::message("Not Found", "The page you asked for does not exist."),
    )
}

/// Middleware: admin routes require a valid session cookie.
async fn require_admin(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    match state.sessions.admin_from_headers(req.headers()) {
        Some(admin) => {
            tracing::debug!(%admin, path = %req.uri().path(), "admin request");
            Ok(next.run(req).await)
        }
        None => {
            tracing::warn!(path = %req.uri().path(), "admin route without session");
            Err(AppError::Unauthorized)
        }
    }
}

/// Middleware: injects a unique X-Request-Id into every response.
async fn request_id_middleware(req: Request, next: Next) -> Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

/// Middleware: injects security headers into every response.
async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));
    // approval tokens travel in the URL path
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        "Permissions-Policy",
        HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
    );
    headers.remove("Server");

    resp
}
