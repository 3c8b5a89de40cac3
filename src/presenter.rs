//! Text rendering of the form and its results. Nothing here mutates state.

use std::fmt::{Display, Write};

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::client::PredictionApi;
use crate::form::{FieldStatus, FormController};
use crate::models::PredictionResult;
use crate::store::HistoryStore;

pub const PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestView {
    pub risk_level: String,
    pub claim_probability: String,
    pub date: String,
    pub time: String,
}

impl LatestView {
    fn placeholder() -> Self {
        LatestView {
            risk_level: PLACEHOLDER.to_string(),
            claim_probability: PLACEHOLDER.to_string(),
            date: PLACEHOLDER.to_string(),
            time: PLACEHOLDER.to_string(),
        }
    }
}

pub fn format_probability(p: f64) -> String {
    format!("{:.2}%", p * 100.0)
}

/// Date and time halves, e.g. `11/20/2024` and `10:30:00 AM`.
pub fn format_timestamp<Tz>(ts: &DateTime<Utc>, tz: &Tz) -> (String, String)
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let local = ts.with_timezone(tz);
    (
        local.format("%-m/%-d/%Y").to_string(),
        local.format("%-I:%M:%S %p").to_string(),
    )
}

fn view_of<Tz>(result: &PredictionResult, tz: &Tz) -> LatestView
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let (date, time) = format_timestamp(&result.timestamp, tz);
    LatestView {
        risk_level: result.risk_level.to_uppercase(),
        claim_probability: format_probability(result.claim_probability),
        date,
        time,
    }
}

pub fn latest_view_in<Tz>(history: &HistoryStore, tz: &Tz) -> LatestView
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    history
        .latest()
        .map(|r| view_of(r, tz))
        .unwrap_or_else(LatestView::placeholder)
}

pub fn latest_view(history: &HistoryStore) -> LatestView {
    latest_view_in(history, &Local)
}

pub fn render_latest_in<Tz>(history: &HistoryStore, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let view = latest_view_in(history, tz);
    let mut out = String::new();
    let _ = writeln!(out, "Predicted Risk");
    let _ = writeln!(out, "  {:<12} {:<18} {}", "Risk Level", "Claim Probability", "Timestamp");
    let _ = writeln!(
        out,
        "  {:<12} {:<18} {}",
        view.risk_level, view.claim_probability, view.date
    );
    if view.time != PLACEHOLDER {
        let _ = writeln!(out, "  {:<12} {:<18} {}", "", "", view.time);
    }
    out
}

pub fn render_latest(history: &HistoryStore) -> String {
    render_latest_in(history, &Local)
}

pub fn render_history_in<Tz>(history: &HistoryStore, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::from("History\n");
    if history.is_empty() {
        out.push_str("  (no predictions yet)\n");
        return out;
    }
    for (i, result) in history.iter().enumerate() {
        let view = view_of(result, tz);
        let _ = writeln!(
            out,
            "  {}. {} {}: Risk Level: {}, Claim Probability: {}",
            i + 1,
            view.date,
            view.time,
            view.risk_level,
            view.claim_probability
        );
    }
    out
}

pub fn render_history(history: &HistoryStore) -> String {
    render_history_in(history, &Local)
}

/// Field grid with inline errors, or the loading placeholder.
pub fn render_form<A: PredictionApi>(form: &FormController<A>) -> String {
    if form.is_loading() {
        return "Loading form...\n".to_string();
    }
    let mut out = String::from("Driver Information\n");
    if form.fields().is_empty() {
        out.push_str("  (no features available)\n");
        return out;
    }
    let width = form
        .fields()
        .iter()
        .map(|f| f.name.len())
        .max()
        .unwrap_or(0);
    for field in form.fields() {
        let value = field.value.as_deref().unwrap_or("");
        let _ = write!(out, "  {:<width$}  {}", field.name, value, width = width);
        if let FieldStatus::Invalid(msg) = &field.status {
            let _ = write!(out, "  <- {}", msg);
        }
        out.push('\n');
    }
    if form.is_pending() {
        out.push_str("Predicting...\n");
    }
    out
}
