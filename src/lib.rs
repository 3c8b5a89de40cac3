pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod models;
pub mod presenter;
pub mod repl;
pub mod schema;
pub mod store;

pub use client::{HttpClient, PredictionApi};
pub use config::ClientConfig;
pub use error::{ApiError, FormError, ValidationErrors};
pub use form::FormController;
pub use models::{FeatureVector, PredictionResponse, PredictionResult, RiskLevel};
pub use schema::FormSchema;
pub use store::{HistoryStore, HISTORY_CAPACITY};
