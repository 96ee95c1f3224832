//! CSV downloads of the filtered table and of the computed aggregates.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::analyzers::types::{QualityMetrics, SummaryStats};
use crate::product::ProductTable;

/// Serializes any list of records as UTF-8 CSV with a header row.
///
/// An empty list produces an empty byte stream since there is no record to
/// derive the header from.
pub fn records_csv<T: Serialize>(records: &[T]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

/// The filtered product table with the persisted column layout.
pub fn table_csv(table: &ProductTable) -> Result<Vec<u8>> {
    if table.is_empty() {
        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(table.column_names())?;
        return Ok(writer.into_inner().map_err(|e| e.into_error())?);
    }
    records_csv(table.rows())
}

pub fn summary_csv(stats: &SummaryStats) -> Result<Vec<u8>> {
    records_csv(std::slice::from_ref(stats))
}

/// Quality metrics as a single row; per-column null fractions become
/// `missing_<column>` fields.
pub fn quality_csv(metrics: &QualityMetrics) -> Result<Vec<u8>> {
    let optional = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();

    let mut header = Vec::new();
    let mut record = Vec::new();
    for entry in &metrics.missing_values {
        header.push(format!("missing_{}", entry.column));
        record.push(optional(entry.null_fraction));
    }
    header.push("completeness_score".to_string());
    record.push(optional(metrics.completeness_score));
    header.push("duplicate_products".to_string());
    record.push(metrics.duplicate_products.to_string());
    header.push("products_with_images".to_string());
    record.push(optional(metrics.products_with_images));

    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&header)?;
    writer.write_record(&record)?;
    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

/// Writes `bytes` to `path`, gzip-compressed with `.gz` appended when asked.
/// Returns the path actually written.
pub fn write_export(path: &Path, bytes: &[u8], gzip: bool) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }

    let (target, body) = if gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes)?;
        let mut name = path.as_os_str().to_owned();
        name.push(".gz");
        (PathBuf::from(name), encoder.finish()?)
    } else {
        (path.to_path_buf(), bytes.to_vec())
    };

    fs::write(&target, &body).with_context(|| format!("writing {}", target.display()))?;
    debug!(path = %target.display(), bytes = body.len(), "Export written");
    Ok(target)
}
