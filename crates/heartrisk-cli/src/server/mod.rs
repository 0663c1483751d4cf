//! HTTP serving shell around the predictor.
//!
//! The model is loaded on the first `/predict` request and shared by every
//! later request. A failed load is not cached, so training while the server
//! is running is picked up by the next request; once loaded, a newer
//! artifact on disk is only seen after a restart.
pub mod page;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use heartrisk_classifiers::artifact::ArtifactStore;
use heartrisk_classifiers::features::PatientRecord;
use heartrisk_classifiers::predict::{Prediction, Predictor};
use heartrisk_classifiers::HeartError;
use heartrisk_classifiers::models::ProbabilisticClassifier;
use serde::{Deserialize, Deserializer};
use tokio::sync::OnceCell;

pub const MODEL_NOT_FOUND_DETAIL: &str =
    "Trained model not found. Run training before serving predictions.";

const SCRIPT_JS: &str = include_str!("../../static/script.js");

/// Shared server state: where the artifact lives and the lazily loaded model.
#[derive(Debug)]
pub struct AppState {
    store: ArtifactStore,
    predictor: OnceCell<Predictor>,
}

impl AppState {
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            store,
            predictor: OnceCell::new(),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// The cached predictor, loading it from the store on first use.
    pub async fn predictor(&self) -> Result<&Predictor, HeartError> {
        self.predictor
            .get_or_try_init(|| async {
                let predictor = Predictor::load(&self.store)?;
                log::info!(
                    "Loaded {} model from {}",
                    predictor.model().name(),
                    self.store.model_path().display()
                );
                Ok::<_, HeartError>(predictor)
            })
            .await
    }
}

/// JSON body of `POST /predict`. `sex` and `chest_pain` are integer codes;
/// whole-number floats such as `1.0` are accepted for them.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PatientPayload {
    pub age: f64,
    #[serde(deserialize_with = "integer_code")]
    pub sex: i64,
    #[serde(deserialize_with = "integer_code")]
    pub chest_pain: i64,
    pub blood_pressure: f64,
    pub cholesterol: f64,
    pub max_hr: f64,
    pub st_depression: f64,
}

fn integer_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() && value.fract() == 0.0 {
        Ok(value as i64)
    } else {
        Err(serde::de::Error::custom(format!(
            "expected an integer code, got {}",
            value
        )))
    }
}

impl From<PatientPayload> for PatientRecord {
    fn from(p: PatientPayload) -> Self {
        PatientRecord {
            age: p.age,
            sex: p.sex as f64,
            chest_pain: p.chest_pain as f64,
            blood_pressure: p.blood_pressure,
            cholesterol: p.cholesterol,
            max_hr: p.max_hr,
            st_depression: p.st_depression,
        }
    }
}

/// Error body in the `{"detail": ...}` shape.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<HeartError> for ApiError {
    fn from(err: HeartError) -> Self {
        log::error!("Prediction failed: {}", err);
        if err.is_model_not_found() {
            ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: MODEL_NOT_FOUND_DETAIL.to_string(),
            }
        } else if err.is_invalid_input() {
            ApiError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                detail: err.to_string(),
            }
        } else {
            ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: err.to_string(),
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/static/script.js", get(script))
        .with_state(state)
}

async fn index() -> Html<String> {
    Html(page::index().into_string())
}

async fn script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        SCRIPT_JS,
    )
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PatientPayload>,
) -> Result<Json<Prediction>, ApiError> {
    let predictor = state.predictor().await?;
    let prediction = predictor.predict(&payload.into())?;
    log::debug!(
        "Prediction {} (p={}, {})",
        prediction.prediction,
        prediction.probability,
        prediction.risk_level
    );
    Ok(Json(prediction))
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!("Serving heart disease risk API on http://{}", addr);
    axum::serve(listener, build_router(state))
        .await
        .context("HTTP server terminated unexpectedly")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use heartrisk_classifiers::config::PipelineConfig;
    use std::fmt::Write as _;
    use std::path::Path;
    use tower::ServiceExt;

    /// Helper: parse JSON response body.
    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn empty_state(dir: &Path) -> Arc<AppState> {
        Arc::new(AppState::new(ArtifactStore::new(
            dir.join("model_v1.bin"),
            dir.join("metadata.json"),
        )))
    }

    /// Train on a small deterministic dataset and return state pointing at
    /// the written artifact.
    fn trained_state(dir: &Path) -> Arc<AppState> {
        let mut csv = String::from("age,sex,chest_pain,rest_bp,chol,max_hr,st_depr,heart_disease\n");
        for i in 0..100usize {
            let label = usize::from(i % 5 < 2);
            writeln!(
                csv,
                "{},{},{},{},{},{},{:.1},{}",
                40 + (i * 7) % 30 + 8 * label,
                (i / 2) % 2,
                i % 4,
                120 + (i * 11) % 30 + 5 * label,
                200 + (i * 13) % 80,
                170 - (i * 17) % 40 - 15 * label,
                ((i * 3) % 20) as f64 / 10.0 + label as f64,
                label
            )
            .unwrap();
        }
        let data_path = dir.join("heart.csv");
        std::fs::write(&data_path, csv).unwrap();
        let config = PipelineConfig {
            data_path,
            model_path: dir.join("model_v1.bin"),
            metadata_path: dir.join("metadata.json"),
            ..PipelineConfig::default()
        };
        heartrisk_classifiers::training::train(&config).unwrap();
        Arc::new(AppState::new(ArtifactStore::from_config(&config)))
    }

    fn predict_request(body: serde_json::Value) -> Request<Body> {
        Request::post("/predict")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    fn sample_patient() -> serde_json::Value {
        serde_json::json!({
            "age": 63, "sex": 1, "chest_pain": 3, "blood_pressure": 145,
            "cholesterol": 233, "max_hr": 150, "st_depression": 2.3
        })
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(empty_state(dir.path()));
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await, serde_json::json!({"status": "healthy"}));
    }

    #[tokio::test]
    async fn index_and_script_are_served() {
        let dir = tempfile::tempdir().unwrap();
        let state = empty_state(dir.path());

        let resp = build_router(Arc::clone(&state))
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = build_router(state)
            .oneshot(Request::get("/static/script.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("application/javascript"));
    }

    #[tokio::test]
    async fn predict_without_model_is_500_with_detail() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(empty_state(dir.path()));
        let resp = app.oneshot(predict_request(sample_patient())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(resp).await,
            serde_json::json!({ "detail": MODEL_NOT_FOUND_DETAIL })
        );
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(empty_state(dir.path()));
        let resp = app
            .oneshot(predict_request(serde_json::json!({ "age": "old" })))
            .await
            .unwrap();
        assert!(resp.status().is_client_error(), "status {}", resp.status());
    }

    #[tokio::test]
    async fn integer_codes_accept_whole_number_floats() {
        let dir = tempfile::tempdir().unwrap();
        let state = trained_state(dir.path());

        let mut patient = sample_patient();
        patient["sex"] = serde_json::json!(1.0);
        patient["chest_pain"] = serde_json::json!(3.0);
        let resp = build_router(Arc::clone(&state))
            .oneshot(predict_request(patient))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let as_float = json_body(resp).await;

        let resp = build_router(Arc::clone(&state))
            .oneshot(predict_request(sample_patient()))
            .await
            .unwrap();
        assert_eq!(json_body(resp).await, as_float);

        let mut fractional = sample_patient();
        fractional["sex"] = serde_json::json!(1.5);
        let resp = build_router(state)
            .oneshot(predict_request(fractional))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn invalid_features_map_to_unprocessable_entity() {
        let err = ApiError::from(HeartError::NonFiniteFeature {
            feature: "age".to_string(),
            value: f64::NAN,
        });
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.detail.contains("age"));

        let err = ApiError::from(HeartError::ModelNotFound("m.bin".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail, MODEL_NOT_FOUND_DETAIL);
    }

    #[tokio::test]
    async fn predict_returns_label_probability_and_band() {
        let dir = tempfile::tempdir().unwrap();
        let state = trained_state(dir.path());

        let resp = build_router(Arc::clone(&state))
            .oneshot(predict_request(sample_patient()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;

        let probability = body["probability"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&probability));
        assert!(((probability * 10_000.0).round() / 10_000.0 - probability).abs() < 1e-12);
        let label = body["prediction"].as_u64().unwrap();
        assert!(label == 0 || label == 1);
        let band = body["risk_level"].as_str().unwrap();
        assert!(["Low Risk", "Moderate Risk", "High Risk"].contains(&band));

        // Same answer from the cached model.
        let again = build_router(state)
            .oneshot(predict_request(sample_patient()))
            .await
            .unwrap();
        assert_eq!(json_body(again).await, body);
    }

    #[tokio::test]
    async fn loaded_model_stays_cached() {
        let dir = tempfile::tempdir().unwrap();
        let state = trained_state(dir.path());
        state.predictor().await.unwrap();

        std::fs::remove_file(state.store().model_path()).unwrap();
        let resp = build_router(state)
            .oneshot(predict_request(sample_patient()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
