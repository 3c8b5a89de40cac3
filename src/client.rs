use awc::http::{header, StatusCode};
use awc::{Client, SendClientRequest};
use log::{debug, error};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::models::{
    FeatureNamesBody, FeatureVector, HealthStatus, PredictionRequest, PredictionResponse,
    SampleBody, SamplePrediction,
};

const BODY_LIMIT: usize = 1024 * 1024;

/// Calls the form needs from the scoring backend.
///
/// Futures are not `Send`: everything runs on the single-threaded actix
/// runtime, one request at a time per caller.
#[allow(async_fn_in_trait)]
pub trait PredictionApi {
    async fn list_feature_names(&self) -> Result<Vec<String>, ApiError>;

    async fn fetch_sample_features(&self) -> Result<FeatureVector, ApiError>;

    async fn predict(&self, features: &FeatureVector) -> Result<PredictionResponse, ApiError>;

    async fn check_health(&self) -> Result<HealthStatus, ApiError>;

    async fn predict_sample(&self) -> Result<SamplePrediction, ApiError>;
}

/// `PredictionApi` over HTTP/JSON.
pub struct HttpClient {
    client: Client,
    config: ClientConfig,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .add_default_header((header::CONTENT_TYPE, "application/json"))
            .add_default_header((header::ACCEPT, "application/json"))
            .finish();
        HttpClient { client, config }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: SendClientRequest,
    ) -> Result<T, ApiError> {
        debug!("-> {}", self.config.endpoint(endpoint));

        let mut response = request.await.map_err(|e| {
            error!("{} unreachable: {}", endpoint, e);
            ApiError::Network(e.to_string())
        })?;
        let status = response.status();
        let body = response.body().limit(BODY_LIMIT).await.map_err(|e| {
            error!("{}: failed reading body: {}", endpoint, e);
            ApiError::Network(e.to_string())
        })?;

        debug!("<- {} {} ({} bytes)", endpoint, status.as_u16(), body.len());

        if !status.is_success() {
            let err = classify_status(endpoint, status, &body);
            error!("{}", err);
            return Err(err);
        }

        serde_json::from_slice(&body).map_err(|e| {
            error!("{}: malformed body: {}", endpoint, e);
            ApiError::Schema {
                endpoint,
                detail: e.to_string(),
            }
        })
    }
}

fn classify_status(endpoint: &'static str, status: StatusCode, body: &[u8]) -> ApiError {
    let rejected = matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
    );
    if endpoint == "/predict" && rejected {
        return ApiError::Validation(server_detail(body));
    }
    ApiError::Status {
        endpoint,
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
    }
}

/// Pulls `detail` out of an error body, which is either a string or a list
/// of per-field complaints.
fn server_detail(body: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => serde_json::Value::Object(map).to_string(),
        },
        _ => String::from_utf8_lossy(body).into_owned(),
    }
}

impl PredictionApi for HttpClient {
    async fn list_feature_names(&self) -> Result<Vec<String>, ApiError> {
        let url = self.config.endpoint("/features");
        let body: FeatureNamesBody = self.call("/features", self.client.get(url).send()).await?;
        Ok(body.features)
    }

    async fn fetch_sample_features(&self) -> Result<FeatureVector, ApiError> {
        let url = self.config.endpoint("/sample");
        let body: SampleBody = self.call("/sample", self.client.get(url).send()).await?;
        Ok(body.features)
    }

    async fn predict(&self, features: &FeatureVector) -> Result<PredictionResponse, ApiError> {
        let url = self.config.endpoint("/predict");
        let request = self
            .client
            .post(url)
            .send_json(&PredictionRequest { features });
        let response: PredictionResponse = self.call("/predict", request).await?;
        response.validate().map_err(|detail| {
            error!("/predict: {}", detail);
            ApiError::Schema {
                endpoint: "/predict",
                detail,
            }
        })?;
        Ok(response)
    }

    async fn check_health(&self) -> Result<HealthStatus, ApiError> {
        let url = self.config.endpoint("/health");
        self.call("/health", self.client.get(url).send()).await
    }

    async fn predict_sample(&self) -> Result<SamplePrediction, ApiError> {
        let url = self.config.endpoint("/predict/sample");
        self.call("/predict/sample", self.client.get(url).send()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_predict_carries_server_detail() {
        let err = classify_status(
            "/predict",
            StatusCode::BAD_REQUEST,
            br#"{"detail":"columns are missing: {'ps_ind_01'}"}"#,
        );
        match err {
            ApiError::Validation(detail) => assert_eq!(detail, "columns are missing: {'ps_ind_01'}"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn list_detail_is_kept_as_json() {
        let detail = server_detail(br#"{"detail":[{"loc":["body","features"],"msg":"field required"}]}"#);
        assert!(detail.contains("field required"));
    }

    #[test]
    fn other_statuses_stay_generic() {
        let err = classify_status("/features", StatusCode::BAD_REQUEST, b"nope");
        assert!(matches!(err, ApiError::Status { status: 400, .. }));

        let err = classify_status("/predict", StatusCode::INTERNAL_SERVER_ERROR, b"boom");
        match err {
            ApiError::Status { endpoint, status, body } => {
                assert_eq!(endpoint, "/predict");
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
