//! CORS handling
//!
//! `CorsLayer` answers real preflights. Any other `OPTIONS` is answered by
//! [`options_ok`] before routing or auth, so a browser never sees a
//! 401/404/405 for it.

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Method, Request, Response, StatusCode},
    middleware::Next,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

const ALLOWED_HEADERS: [HeaderName; 5] = [
    header::AUTHORIZATION,
    header::CONTENT_TYPE,
    HeaderName::from_static("stripe-signature"),
    HeaderName::from_static("x-client-info"),
    HeaderName::from_static("apikey"),
];

/// CORS layer for the configured origin; `*` allows any origin
pub fn cors_layer(allowed_origin: &str) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allow_origin(allowed_origin))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(ALLOWED_HEADERS)
}

fn allow_origin(configured: &str) -> AllowOrigin {
    if configured.trim() == "*" {
        return Any.into();
    }
    match HeaderValue::from_str(configured.trim()) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            tracing::warn!(origin = %configured, "Invalid CORS_ALLOWED_ORIGIN, falling back to *");
            Any.into()
        }
    }
}

/// Answer every `OPTIONS` with 200 `ok` without reaching the router
pub async fn options_ok(request: Request<Body>, next: Next) -> Response<Body> {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    let mut response = Response::new(Body::from("ok"));
    *response.status_mut() = StatusCode::OK;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Router};
    use tower::ServiceExt;

    fn app(origin: &str) -> Router {
        Router::new()
            .route("/hook", post(|| async { "posted" }))
            .layer(axum::middleware::from_fn(options_ok))
            .layer(cors_layer(origin))
    }

    #[tokio::test]
    async fn test_preflight_allows_stripe_signature() {
        let response = app("*")
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/hook")
                    .header(header::ORIGIN, "https://app.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "stripe-signature")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let allowed = response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(allowed.contains("stripe-signature"));
    }

    #[tokio::test]
    async fn test_bare_options_gets_ok_body() {
        let response = app("https://app.example.com")
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/not-routed")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example.com"
        );
    }

    #[tokio::test]
    async fn test_invalid_origin_falls_back_to_wildcard() {
        let response = app("bad\norigin")
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/hook")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
