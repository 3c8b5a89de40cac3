//! Validation rules built at runtime from the backend's feature list.
//!
//! A [`FormSchema`] is never edited after [`FormSchema::build`]; when the
//! feature list changes the caller builds a new one.

use std::collections::{BTreeMap, HashSet};

use crate::error::ValidationErrors;
use crate::models::FeatureVector;

pub const REQUIRED: &str = "Required";

/// One numeric, required field per feature name, in backend order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSchema {
    fields: Vec<String>,
}

impl FormSchema {
    pub fn build<S: AsRef<str>>(names: &[S]) -> Self {
        let mut seen = HashSet::new();
        let fields = names
            .iter()
            .map(|n| n.as_ref())
            .filter(|n| seen.insert(*n))
            .map(str::to_string)
            .collect();
        FormSchema { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Checks one raw input against the numeric rule.
    pub fn check_value(raw: Option<&str>) -> Result<f64, String> {
        let text = raw.map(str::trim).unwrap_or("");
        if text.is_empty() {
            return Err(REQUIRED.to_string());
        }
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(format!("Expected number, received `{}`", text)),
        }
    }

    /// Coerces every schema field; keys outside the schema are dropped.
    pub fn validate(&self, input: &BTreeMap<String, String>) -> Result<FeatureVector, ValidationErrors> {
        let mut values = FeatureVector::new();
        let mut errors = ValidationErrors::default();

        for name in &self.fields {
            match Self::check_value(input.get(name).map(String::as_str)) {
                Ok(v) => {
                    values.insert(name.clone(), v);
                }
                Err(message) => errors.push(name.clone(), message),
            }
        }

        if errors.is_empty() {
            Ok(values)
        } else {
            Err(errors)
        }
    }
}
