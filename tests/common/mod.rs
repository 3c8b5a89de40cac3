#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpResponse, HttpServer};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Value};

use risk_form::models::{HealthStatus, SamplePrediction};
use risk_form::{ApiError, ClientConfig, FeatureVector, PredictionApi, PredictionResponse, RiskLevel};

/// Stand-in for the scoring service, served over real HTTP.
pub struct Backend {
    pub features: Vec<String>,
    pub sample: Value,
    pub probability: f64,
    pub malformed: bool,
    pub received: Mutex<Vec<Value>>,
}

impl Backend {
    pub fn new(features: &[&str], sample: Value, probability: f64) -> Self {
        Backend {
            features: features.iter().map(|s| s.to_string()).collect(),
            sample,
            probability,
            malformed: false,
            received: Mutex::new(Vec::new()),
        }
    }
}

pub struct TestServer {
    pub backend: web::Data<Backend>,
    pub base_url: String,
    handle: ServerHandle,
}

impl TestServer {
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn received(&self) -> Vec<Value> {
        self.backend.received.lock().unwrap().clone()
    }

    pub async fn stop(self) {
        self.handle.stop(true).await;
    }
}

async fn health(state: web::Data<Backend>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "healthy", "model_loaded": !state.features.is_empty() }))
}

async fn features(state: web::Data<Backend>) -> HttpResponse {
    if state.malformed {
        return HttpResponse::Ok().json(json!({ "names": "ps_ind_01" }));
    }
    HttpResponse::Ok().json(json!({ "features": state.features }))
}

async fn sample(state: web::Data<Backend>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "features": state.sample }))
}

#[derive(Deserialize)]
struct PredictBody {
    #[serde(default)]
    features: Option<IndexMap<String, Value>>,
}

async fn predict(state: web::Data<Backend>, body: web::Bytes) -> HttpResponse {
    let Ok(raw) = serde_json::from_slice::<Value>(&body) else {
        return HttpResponse::BadRequest().json(json!({ "detail": "body is not JSON" }));
    };
    state.received.lock().unwrap().push(raw);

    // `Value` sorts object keys, so the column order is read separately.
    let features = match serde_json::from_slice::<PredictBody>(&body) {
        Ok(PredictBody { features: Some(f) }) if !f.is_empty() => f,
        _ => {
            return HttpResponse::UnprocessableEntity().json(json!({
                "detail": [{ "loc": ["body", "features"], "msg": "field required", "type": "value_error.missing" }]
            }))
        }
    };

    let missing: Vec<&str> = state
        .features
        .iter()
        .filter(|n| !features.contains_key(n.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return HttpResponse::BadRequest()
            .json(json!({ "detail": format!("columns are missing: {:?}", missing) }));
    }

    let order: Vec<&str> = features.keys().map(String::as_str).collect();
    if order != state.features {
        return HttpResponse::BadRequest().json(json!({
            "detail": format!("feature_names mismatch: expected {:?}, got {:?}", state.features, order)
        }));
    }

    HttpResponse::Ok().json(json!({
        "claim_probability": state.probability,
        "risk_level": RiskLevel::from_probability(state.probability),
    }))
}

async fn predict_sample(state: web::Data<Backend>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "claim_probability": state.probability, "sample_used": true }))
}

pub async fn spawn(backend: Backend) -> TestServer {
    let data = web::Data::new(backend);
    let app_data = data.clone();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_data.clone())
            .route("/health", web::get().to(health))
            .route("/features", web::get().to(features))
            .route("/sample", web::get().to(sample))
            .route("/predict", web::post().to(predict))
            .route("/predict/sample", web::get().to(predict_sample))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind test backend");

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    TestServer {
        backend: data,
        base_url: format!("http://{}", addr),
        handle,
    }
}

/// A port nothing listens on.
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// In-memory `PredictionApi` with scripted answers.
pub struct FakeApi {
    pub names: Vec<String>,
    pub sample: RefCell<Option<FeatureVector>>,
    pub responses: RefCell<VecDeque<Result<PredictionResponse, ApiError>>>,
    pub submitted: RefCell<Vec<FeatureVector>>,
    pub list_calls: Cell<usize>,
    pub offline: Cell<bool>,
}

impl FakeApi {
    pub fn new(names: &[&str]) -> Self {
        FakeApi {
            names: names.iter().map(|s| s.to_string()).collect(),
            sample: RefCell::new(None),
            responses: RefCell::new(VecDeque::new()),
            submitted: RefCell::new(Vec::new()),
            list_calls: Cell::new(0),
            offline: Cell::new(false),
        }
    }

    pub fn with_sample(self, pairs: &[(&str, f64)]) -> Self {
        *self.sample.borrow_mut() = Some(pairs.iter().copied().collect());
        self
    }

    pub fn respond(self, probability: f64, risk_level: RiskLevel) -> Self {
        self.responses.borrow_mut().push_back(Ok(PredictionResponse {
            claim_probability: probability,
            risk_level,
        }));
        self
    }

    pub fn fail(self, err: ApiError) -> Self {
        self.responses.borrow_mut().push_back(Err(err));
        self
    }
}

impl PredictionApi for FakeApi {
    async fn list_feature_names(&self) -> Result<Vec<String>, ApiError> {
        self.list_calls.set(self.list_calls.get() + 1);
        if self.offline.get() {
            return Err(ApiError::Network("connection refused".into()));
        }
        Ok(self.names.clone())
    }

    async fn fetch_sample_features(&self) -> Result<FeatureVector, ApiError> {
        self.sample
            .borrow()
            .clone()
            .ok_or_else(|| ApiError::Network("connection refused".into()))
    }

    async fn predict(&self, features: &FeatureVector) -> Result<PredictionResponse, ApiError> {
        self.submitted.borrow_mut().push(features.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("no scripted response".into())))
    }

    async fn check_health(&self) -> Result<HealthStatus, ApiError> {
        Ok(json!({ "status": "healthy" }))
    }

    async fn predict_sample(&self) -> Result<SamplePrediction, ApiError> {
        Ok(SamplePrediction {
            claim_probability: 0.0364,
            sample_used: true,
        })
    }
}
