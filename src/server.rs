//! HTTP surface: `POST /predict`, CORS preflight and a health probe.

use crate::error::PredictError;
use crate::metrics::ServiceMetrics;
use crate::predictor::Predictor;
use crate::types::prediction::{ErrorResponse, PredictionResponse};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, warn};

/// Shared, read-only state injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(predictor: Arc<Predictor>, metrics: Arc<ServiceMetrics>) -> Self {
        Self { predictor, metrics }
    }
}

/// Build the service router.
///
/// The CORS layer answers `OPTIONS` preflights itself and adds permissive
/// headers to every other response.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .with_state(state)
        .layer(cors)
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn predict(State(state): State<AppState>, body: Bytes) -> Response {
    let start = Instant::now();

    let result = serde_json::from_slice::<Value>(&body)
        .map_err(|e| PredictError::Validation(format!("invalid JSON body: {e}")))
        .and_then(|payload| state.predictor.predict_json(&payload));

    let latency = start.elapsed();
    match result {
        Ok(label) => {
            state.metrics.record_prediction(latency, label);
            debug!(
                prediction = %label,
                latency_us = latency.as_micros(),
                "Prediction served"
            );
            Json(PredictionResponse { prediction: label }).into_response()
        }
        Err(e) => {
            state.metrics.record_failure(latency, &e);
            if e.is_client_error() {
                warn!(kind = e.kind(), error = %e, "Rejected prediction request");
            } else {
                error!(kind = e.kind(), error = %e, "Prediction failed");
            }
            e.into_response()
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "features": state.predictor.feature_count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extractor::tests::reference_schema;
    use crate::models::inference::tests::FixedClassifier;
    use crate::models::scaler::StandardScaler;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    fn app_with(class: i64) -> (Router, Arc<FixedClassifier>, Arc<ServiceMetrics>) {
        let classifier = Arc::new(FixedClassifier::with_width(class, 15));
        let scaler = StandardScaler::new(vec![0.0; 6], vec![1.0; 6], None).unwrap();
        let predictor = Predictor::new(Arc::new(reference_schema()), scaler, classifier.clone());
        let metrics = Arc::new(ServiceMetrics::new());
        let state = AppState::new(Arc::new(predictor), metrics.clone());
        (router(state), classifier, metrics)
    }

    fn post_predict(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(body.into())
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn example_body() -> String {
        json!({
            "age": 45,
            "hypertension": 1,
            "heart_disease": 0,
            "bmi": 28.5,
            "hba1c_level": 6.1,
            "glucose": 140,
            "gender": "Female",
            "smoking_history": "never",
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_predict_diabetic() {
        let (app, _, metrics) = app_with(1);

        let response = app.oneshot(post_predict(example_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        assert_eq!(json_body(response).await, json!({"prediction": "Diabetic"}));
        assert_eq!(metrics.diabetic.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_predict_non_diabetic() {
        let (app, _, _) = app_with(0);

        let response = app.oneshot(post_predict(example_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"prediction": "Non-Diabetic"}));
    }

    #[tokio::test]
    async fn test_missing_age_returns_error_body() {
        let (app, classifier, metrics) = app_with(1);
        let mut body: Value = serde_json::from_str(&example_body()).unwrap();
        body.as_object_mut().unwrap().remove("age");

        let response = app.oneshot(post_predict(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("age"));
        assert_eq!(classifier.calls.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.failures_total(), 1);
    }

    #[tokio::test]
    async fn test_missing_gender_returns_error_body() {
        let (app, classifier, _) = app_with(1);
        let mut body: Value = serde_json::from_str(&example_body()).unwrap();
        body.as_object_mut().unwrap().remove("gender");

        let response = app.oneshot(post_predict(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({"error": "missing required field 'gender' (accepted keys: gender)"})
        );
        assert_eq!(classifier.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let (app, _, _) = app_with(1);

        let response = app.oneshot(post_predict("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("invalid JSON body"));
    }

    #[tokio::test]
    async fn test_inference_failure_is_internal_error() {
        let classifier = Arc::new(FixedClassifier::with_width(1, 3));
        let scaler = StandardScaler::new(vec![0.0; 6], vec![1.0; 6], None).unwrap();
        let predictor = Predictor::new(Arc::new(reference_schema()), scaler, classifier);
        let app = router(AppState::new(
            Arc::new(predictor),
            Arc::new(ServiceMetrics::new()),
        ));

        let response = app.oneshot(post_predict(example_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("inference failed"));
    }

    #[tokio::test]
    async fn test_preflight_acknowledged_without_inference() {
        let (app, classifier, _) = app_with(1);

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/predict")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let methods = response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("POST"));
        assert_eq!(classifier.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_post_response_carries_only_allow_origin() {
        let (app, _, _) = app_with(0);

        let response = app.oneshot(post_predict(example_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).is_none());
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).is_none());
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _, _) = app_with(0);

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "ok", "features": 15}));
    }
}
