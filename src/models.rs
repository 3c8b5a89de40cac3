use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Named numeric inputs for one scoring request. The key set is whatever the
/// backend reports from `/features`, kept in insertion order: the scoring
/// service matches columns by position as well as by name.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
#[serde(transparent)]
pub struct FeatureVector(IndexMap<String, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PredictionRequest<'a> {
    pub features: &'a FeatureVector,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Same banding the scoring service applies to its probability.
    pub fn from_probability(probability: f64) -> Self {
        match probability {
            p if p < 0.1 => RiskLevel::Low,
            p if p < 0.3 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn to_uppercase(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct PredictionResponse {
    pub claim_probability: f64,
    pub risk_level: RiskLevel,
}

impl PredictionResponse {
    pub fn validate(&self) -> Result<(), String> {
        let p = self.claim_probability;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(format!("claim_probability must be within [0, 1] (value: {})", p));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PredictionResult {
    pub claim_probability: f64,
    pub risk_level: RiskLevel,
    pub timestamp: DateTime<Utc>,
    pub features: FeatureVector,
}

impl PredictionResult {
    pub fn new(response: PredictionResponse, features: FeatureVector) -> Self {
        Self::at(response, features, Utc::now())
    }

    pub fn at(response: PredictionResponse, features: FeatureVector, timestamp: DateTime<Utc>) -> Self {
        PredictionResult {
            claim_probability: response.claim_probability,
            risk_level: response.risk_level,
            timestamp,
            features,
        }
    }

    pub fn response(&self) -> PredictionResponse {
        PredictionResponse {
            claim_probability: self.claim_probability,
            risk_level: self.risk_level,
        }
    }
}

/// Payload of `GET /predict/sample`, the backend's self-test.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct SamplePrediction {
    pub claim_probability: f64,
    #[serde(default)]
    pub sample_used: bool,
}

pub type HealthStatus = serde_json::Value;

#[derive(Debug, Deserialize, Serialize)]
pub struct FeatureNamesBody {
    pub features: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SampleBody {
    pub features: FeatureVector,
}
