//! Output formatting and persistence for survey tables and fit summaries.
//!
//! Supports writing the augmented survey, JSON logging, and appending one
//! summary row per fitted population to a CSV file.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::curve::GroupCurve;
use crate::parser::SurveyTable;
use crate::surplus::SurplusEstimate;
use csv::WriterBuilder;
use std::fs::{self, OpenOptions};
use std::path::Path;

/// One fitted population, as stored in the summary CSV.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct FitRecord {
    pub timestamp: DateTime<Utc>,
    pub field: Option<String>,
    pub group: String,
    pub samples: usize,

    pub intercept: Option<f64>,
    pub slope: Option<f64>,
    pub r_squared: Option<f64>,
    pub quantity_intercept: Option<f64>,
    pub consumer_surplus: Option<f64>,

    pub error_message: Option<String>,
}

impl FitRecord {
    pub fn from_curve(field: Option<&str>, curve: &GroupCurve) -> Self {
        FitRecord {
            timestamp: Utc::now(),
            field: field.map(str::to_string),
            group: curve.label.clone(),
            samples: curve.samples.len(),
            intercept: curve.fit.map(|f| f.intercept),
            slope: curve.fit.map(|f| f.slope),
            r_squared: curve.fit.map(|f| f.r_squared),
            ..Default::default()
        }
    }

    pub fn from_surplus(estimate: &SurplusEstimate) -> Self {
        FitRecord {
            timestamp: Utc::now(),
            group: "All respondents".to_string(),
            samples: estimate.samples.len(),
            intercept: Some(estimate.fit.intercept),
            slope: Some(estimate.fit.slope),
            r_squared: Some(estimate.fit.r_squared),
            quantity_intercept: Some(estimate.quantity_intercept),
            consumer_surplus: Some(estimate.consumer_surplus),
            ..Default::default()
        }
    }

    /// Attach an error message to an otherwise populated record.
    pub fn with_error(mut self, error_message: &str) -> Self {
        self.error_message = Some(error_message.to_string());
        self
    }

    /// Create a record for a population that could not be estimated.
    pub fn from_error(group: &str, samples: usize, error_message: &str) -> Self {
        FitRecord {
            timestamp: Utc::now(),
            group: group.to_string(),
            samples,
            error_message: Some(error_message.to_string()),
            ..Default::default()
        }
    }
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `table` to `path` as CSV, creating parent directories as needed.
pub fn write_survey(path: &str, table: &SurveyTable) -> Result<()> {
    ensure_parent(Path::new(path))?;

    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    info!(path, rows = table.len(), columns = table.headers.len(), "Survey written");
    Ok(())
}

/// Appends a [`FitRecord`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, record: &FitRecord) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");
    ensure_parent(Path::new(path))?;

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
