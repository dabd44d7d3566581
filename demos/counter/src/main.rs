//! Visit counter: an axum server that keeps a per-visitor count in a Stash
//! session.
//!
//! ```text
//! cargo run -p counter [config.json]
//! curl -c jar -b jar localhost:8080/         -> {"visits":1,...}
//! curl -c jar -b jar localhost:8080/         -> {"visits":2,...}
//! curl -c jar -b jar localhost:8080/logout   -> {"logged_out":true}
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use stash::prelude::*;
use tokio::net::TcpListener;
use tracing::{info, warn};

const BIND_ADDR: &str = "127.0.0.1:8080";

// ---------------------------------------------------------------------------
// Cookie glue
// ---------------------------------------------------------------------------

/// Every `Cookie` header on the request.
fn request_cookies(headers: &HeaderMap) -> RequestCookies {
    RequestCookies::from_headers(
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok()),
    )
}

/// One `Set-Cookie` header per queued cookie.
fn set_cookie_headers(cookies: &ResponseCookies) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for value in cookies.header_values() {
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "dropping unencodable Set-Cookie"),
        }
    }
    headers
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct AppState {
    manager: Arc<SessionManager>,
}

/// A session failure, reported as 503 with a JSON body.
struct AppError(StashError);

impl<E> From<E> for AppError
where
    E: Into<StashError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        warn!(error = %self.0, "session unavailable");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

async fn visit(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<Value>), AppError> {
    let mut cookies = ResponseCookies::new();
    let session = state.manager.start(&request_cookies(&headers), &mut cookies)?;

    let visits = session.get_as::<u64>("visits").map_or(0, |n| *n) + 1;
    session.insert("visits", visits)?;

    Ok((
        set_cookie_headers(&cookies),
        Json(json!({ "visits": visits, "session": session.id() })),
    ))
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<Value>), AppError> {
    let mut cookies = ResponseCookies::new();
    state.manager.stop(&request_cookies(&headers), &mut cookies)?;
    Ok((set_cookie_headers(&cookies), Json(json!({ "logged_out": true }))))
}

fn router(manager: Arc<SessionManager>) -> Router {
    Router::new()
        .route("/", get(visit))
        .route("/logout", get(logout).post(logout))
        .with_state(AppState { manager })
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn load_config() -> Result<ManagerConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        None => Ok(ManagerConfig::default().cookie_name("counter_sid").max_idle_secs(300)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = stash::logging::init("info");

    let stash = Stash::builder().config(load_config()?).build()?;
    let (_registry, manager) = stash.into_parts();
    let manager = Arc::new(manager);

    let listener = TcpListener::bind(BIND_ADDR).await?;
    info!(addr = %listener.local_addr()?, "counter listening");

    axum::serve(listener, router(Arc::clone(&manager)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("shutting down");
    if let Ok(mut manager) = Arc::try_unwrap(manager) {
        manager.shutdown().await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    fn test_router() -> Router {
        let stash = Stash::builder()
            .config(ManagerConfig::default().cookie_name("sid"))
            .build()
            .unwrap();
        let (_registry, manager) = stash.into_parts();
        router(Arc::new(manager))
    }

    async fn body_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// `sid=<value>` from the response's `Set-Cookie` header.
    fn session_cookie(response: &Response) -> String {
        let header = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("Set-Cookie present")
            .to_str()
            .unwrap();
        header.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_visit_counts_per_session() {
        let app = test_router();

        let first = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let cookie = session_cookie(&first);
        assert_eq!(body_json(first).await["visits"], 1);

        let second = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::COOKIE, format!("theme=dark; {cookie}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(second.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(body_json(second).await["visits"], 2);
    }

    #[tokio::test]
    async fn test_visit_with_query_string_is_routed() {
        let response = test_router()
            .oneshot(Request::builder().uri("/?ref=x").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["visits"], 1);
    }

    #[tokio::test]
    async fn test_logout_expires_cookie_and_resets_count() {
        let app = test_router();
        let first = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = session_cookie(&first);

        let logout = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/logout")
                    .header(header::COOKIE, cookie.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let expired = logout
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(expired.contains("Max-Age=0"), "{expired}");
        assert_eq!(body_json(logout).await["logged_out"], true);

        let again = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(again).await["visits"], 1);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let response = test_router()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
