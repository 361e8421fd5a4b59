use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub async fn health() -> &'static str {
    "OK"
}

pub async fn ready(axum::extract::State(state): axum::extract::State<AppState>) -> StatusCode {
    match state.readiness.check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ReadinessProbe;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    struct AlwaysReady;
    #[async_trait]
    impl ReadinessProbe for AlwaysReady {
        async fn check(&self) -> Result<(), String> {
            Ok(())
        }
    }

    struct NeverReady;
    #[async_trait]
    impl ReadinessProbe for NeverReady {
        async fn check(&self) -> Result<(), String> {
            Err("no connection".to_string())
        }
    }

    #[tokio::test]
    async fn health_returns_200_with_ok_body() {
        let app = build_app(AppState { readiness: Arc::new(AlwaysReady) });
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn ready_returns_200_when_probe_succeeds() {
        let app = build_app(AppState { readiness: Arc::new(AlwaysReady) });
        let resp = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_returns_503_when_probe_fails() {
        let app = build_app(AppState { readiness: Arc::new(NeverReady) });
        let resp = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
