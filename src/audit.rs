//! # audit: Jira and Confluence audit log export
//!
//! Pulls every audit record in a trailing window of months, writes one CSV
//! per product and uploads each file to object storage.
//!
//! ## Paging
//! Both products page with a fixed limit of [`AUDIT_PAGE_LIMIT`]; a page
//! shorter than the limit is the last one.
//!
//! ## CSV layout
//! The header is the sorted union of keys across all records of a product.
//! String values are written as-is, other JSON values in their JSON form,
//! and missing or null values as an empty cell.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Months, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::contract::{AuditRecord, AuditSource, AuditWindow, ObjectStore};
use crate::error::{ApiError, AuditError};

pub const AUDIT_PAGE_LIMIT: usize = 1000;
pub const DEFAULT_MONTHS: u32 = 7;

impl AuditWindow {
    /// The `months` calendar months ending at `now`.
    pub fn last_months(now: DateTime<Utc>, months: u32) -> Self {
        let from = now
            .checked_sub_months(Months::new(months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { from, to: now }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditProduct {
    Jira,
    Confluence,
}

impl AuditProduct {
    pub const ALL: [AuditProduct; 2] = [AuditProduct::Jira, AuditProduct::Confluence];

    pub fn name(self) -> &'static str {
        match self {
            AuditProduct::Jira => "jira",
            AuditProduct::Confluence => "confluence",
        }
    }

    /// `jira_audit_20240131.csv`
    pub fn file_name(self, day: DateTime<Utc>) -> String {
        format!("{}_audit_{}.csv", self.name(), day.format("%Y%m%d"))
    }
}

/// Confluence reports `creationDate` in epoch milliseconds. Rewrite it as
/// RFC 3339; values that are not a millisecond count stay untouched.
pub fn normalise_creation_date(record: &mut AuditRecord) {
    let Some(value) = record.get_mut("creationDate") else {
        return;
    };
    let millis = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    if let Some(iso) = millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339())
    {
        *value = Value::String(iso);
    }
}

pub async fn fetch_audit_records<S>(
    source: &S,
    product: AuditProduct,
    window: AuditWindow,
) -> Result<Vec<AuditRecord>, ApiError>
where
    S: AuditSource + ?Sized,
{
    let mut records = Vec::new();
    let mut offset = 0;

    loop {
        let batch = match product {
            AuditProduct::Jira => source.jira_audit_page(window, offset, AUDIT_PAGE_LIMIT).await?,
            AuditProduct::Confluence => {
                source
                    .confluence_audit_page(window, offset, AUDIT_PAGE_LIMIT)
                    .await?
            }
        };
        let received = batch.len();
        debug!(product = product.name(), offset, received, "Fetched audit page");
        records.extend(batch);
        if received < AUDIT_PAGE_LIMIT {
            break;
        }
        offset += AUDIT_PAGE_LIMIT;
    }

    if product == AuditProduct::Confluence {
        records.iter_mut().for_each(normalise_creation_date);
    }
    info!(product = product.name(), count = records.len(), "Fetched audit records");
    Ok(records)
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn write_csv<W: Write>(records: &[AuditRecord], writer: W) -> Result<(), csv::Error> {
    let keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.keys().map(String::as_str))
        .collect();

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&keys)?;
    for record in records {
        csv.write_record(keys.iter().map(|key| cell(record.get(*key))))?;
    }
    csv.flush()?;
    Ok(())
}

/// `{folder}/{file}`, or `{file}` when no folder is configured.
pub fn object_name(folder: Option<&str>, file_name: &str) -> String {
    match folder {
        Some(folder) if !folder.is_empty() => format!("{folder}/{file_name}"),
        _ => file_name.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditExport {
    pub product: AuditProduct,
    pub records: usize,
    /// Local CSV, absent when there were no records.
    pub file: Option<PathBuf>,
    pub location: Option<String>,
}

/// Export both products for `window`, naming files after `today`.
pub async fn export_audit_logs<S, O>(
    source: &S,
    store: &O,
    window: AuditWindow,
    today: DateTime<Utc>,
    output_dir: &Path,
    folder: Option<&str>,
) -> Result<Vec<AuditExport>, AuditError>
where
    S: AuditSource + ?Sized,
    O: ObjectStore + ?Sized,
{
    info!(from = %window.from, to = %window.to, "Exporting audit logs");
    fs::create_dir_all(output_dir)?;
    let mut exports = Vec::with_capacity(AuditProduct::ALL.len());

    for product in AuditProduct::ALL {
        let records = fetch_audit_records(source, product, window).await?;
        let file_name = product.file_name(today);
        if records.is_empty() {
            info!(product = product.name(), file = %file_name, "No records found, skipping file");
            exports.push(AuditExport {
                product,
                records: 0,
                file: None,
                location: None,
            });
            continue;
        }

        let mut bytes = Vec::new();
        write_csv(&records, &mut bytes)?;
        let path = output_dir.join(&file_name);
        fs::write(&path, &bytes)?;
        info!(file = ?path, records = records.len(), "Wrote audit CSV");

        let location = store
            .upload(&object_name(folder, &file_name), bytes, "text/csv")
            .await?;
        exports.push(AuditExport {
            product,
            records: records.len(),
            file: Some(path),
            location: Some(location),
        });
    }
    Ok(exports)
}
