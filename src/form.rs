//! The prediction form: fields built from the backend's feature list, the
//! "load sample" and "submit" actions, and the history they feed.

use std::collections::BTreeMap;

use log::{error, info, warn};

use crate::client::PredictionApi;
use crate::error::{ApiError, FormError};
use crate::models::{FeatureVector, PredictionResult};
use crate::schema::FormSchema;
use crate::store::HistoryStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldStatus {
    Empty,
    Edited,
    Valid,
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: Option<String>,
    pub status: FieldStatus,
}

impl Field {
    fn new(name: &str) -> Self {
        Field {
            name: name.to_string(),
            value: None,
            status: FieldStatus::Empty,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FieldStatus::Invalid(msg) => Some(msg.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Submitting,
}

/// Holds the form in `Submitting` for as long as it lives, so a dropped
/// submit future still releases the form.
struct InFlight<'a>(&'a mut SubmitState);

impl<'a> InFlight<'a> {
    fn enter(state: &'a mut SubmitState) -> Self {
        *state = SubmitState::Submitting;
        InFlight(state)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = SubmitState::Idle;
    }
}

pub struct FormController<A: PredictionApi> {
    api: A,
    feature_names: Option<Vec<String>>,
    schema: FormSchema,
    fields: Vec<Field>,
    state: SubmitState,
    history: HistoryStore,
}

impl<A: PredictionApi> FormController<A> {
    pub fn new(api: A) -> Self {
        FormController {
            api,
            feature_names: None,
            schema: FormSchema::default(),
            fields: Vec::new(),
            state: SubmitState::Idle,
            history: HistoryStore::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// True until a feature list has been applied.
    pub fn is_loading(&self) -> bool {
        self.feature_names.is_none()
    }

    pub fn is_pending(&self) -> bool {
        self.state == SubmitState::Submitting
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Fetches the feature list once per session.
    pub async fn load_features(&mut self) -> Result<(), ApiError> {
        if self.feature_names.is_some() {
            return Ok(());
        }
        match self.api.list_feature_names().await {
            Ok(names) => {
                info!("form ready with {} features", names.len());
                self.apply_feature_names(names);
                Ok(())
            }
            Err(e) => {
                error!("could not load feature names: {}", e);
                Err(e)
            }
        }
    }

    /// Rebuilds schema and fields when `names` differs from the current list.
    pub fn apply_feature_names(&mut self, names: Vec<String>) {
        if self.feature_names.as_ref() == Some(&names) {
            return;
        }
        let schema = FormSchema::build(&names);
        let mut previous: BTreeMap<String, Field> = self
            .fields
            .drain(..)
            .map(|f| (f.name.clone(), f))
            .collect();
        self.fields = schema
            .fields()
            .iter()
            .map(|name| previous.remove(name).unwrap_or_else(|| Field::new(name)))
            .collect();
        self.schema = schema;
        self.feature_names = Some(names);
    }

    pub fn set_field(&mut self, name: &str, raw: &str) -> Result<(), FormError> {
        let field = self.field_mut(name)?;
        field.value = Some(raw.to_string());
        field.status = FieldStatus::Edited;
        Ok(())
    }

    pub fn clear_field(&mut self, name: &str) -> Result<(), FormError> {
        let field = self.field_mut(name)?;
        field.value = None;
        field.status = FieldStatus::Empty;
        Ok(())
    }

    fn field_mut(&mut self, name: &str) -> Result<&mut Field, FormError> {
        if self.is_loading() {
            return Err(FormError::NotLoaded);
        }
        self.fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    /// Current raw text of every field that has one.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .filter_map(|f| f.value.clone().map(|v| (f.name.clone(), v)))
            .collect()
    }

    /// Replaces every field with the backend's sample row. In-progress edits
    /// are discarded. A failed fetch or empty sample leaves the form alone.
    pub async fn load_sample(&mut self) -> Result<usize, FormError> {
        if self.is_loading() {
            return Err(FormError::NotLoaded);
        }
        if self.is_pending() {
            return Err(FormError::Busy);
        }

        let sample = self.api.fetch_sample_features().await.map_err(|e| {
            error!("sample fetch failed: {}", e);
            e
        })?;
        if sample.is_empty() {
            warn!("sample fetch returned no data, form left unchanged");
            return Ok(0);
        }

        let mut filled = 0;
        for field in &mut self.fields {
            match sample.get(&field.name) {
                Some(v) => {
                    field.value = Some(v.to_string());
                    field.status = FieldStatus::Edited;
                    filled += 1;
                }
                None => {
                    field.value = None;
                    field.status = FieldStatus::Empty;
                }
            }
        }
        info!("loaded sample into {}/{} fields", filled, self.fields.len());
        Ok(filled)
    }

    /// Validates, predicts, and records the result on success.
    pub async fn submit(&mut self) -> Result<PredictionResult, FormError> {
        if self.is_loading() {
            return Err(FormError::NotLoaded);
        }
        if self.is_pending() {
            return Err(FormError::Busy);
        }
        if self.schema.is_empty() {
            return Err(FormError::NothingToSubmit);
        }

        let features = self.validate_fields()?;

        let in_flight = InFlight::enter(&mut self.state);
        let outcome = self.api.predict(&features).await;
        drop(in_flight);

        match outcome {
            Ok(response) => {
                info!(
                    "prediction: risk={} probability={:.4}",
                    response.risk_level, response.claim_probability
                );
                let result = PredictionResult::new(response, features);
                self.history.push(result.clone());
                Ok(result)
            }
            Err(e) => {
                error!("prediction failed: {}", e);
                Err(e.into())
            }
        }
    }

    fn validate_fields(&mut self) -> Result<FeatureVector, FormError> {
        let result = self.schema.validate(&self.values());
        for field in &mut self.fields {
            field.status = match &result {
                Ok(_) => FieldStatus::Valid,
                Err(errors) => match errors.get(&field.name) {
                    Some(msg) => FieldStatus::Invalid(msg.to_string()),
                    None if field.value.is_some() => FieldStatus::Valid,
                    None => FieldStatus::Empty,
                },
            };
        }
        result.map_err(FormError::from)
    }
}
