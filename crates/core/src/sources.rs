//! Reading taxonomy source tables from disk.
//!
//! Workbooks (`.xlsx`, `.xls`, `.ods`) are read from their first worksheet with
//! the first row as header. `.json` files hold an array of objects.

use crate::config::SourceConfig;
use crate::error::SkillMapError;
use crate::taxonomy::SourceRecord;
use std::fs;
use std::path::Path;
use tracing::info;

pub fn load_sources(sources: &[SourceConfig]) -> Result<Vec<Vec<SourceRecord>>, SkillMapError> {
    sources.iter().map(load_source).collect()
}

pub fn load_source(source: &SourceConfig) -> Result<Vec<SourceRecord>, SkillMapError> {
    let path = Path::new(&source.path);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    let records = match ext.as_str() {
        "json" => load_json(path, source)?,
        "xlsx" | "xlsm" | "xls" | "ods" => load_workbook(path, source)?,
        other => {
            return Err(source_error(
                path,
                format!("unsupported source format {:?}", other),
            ))
        }
    };
    info!("Read {} records from {}", records.len(), source.path);
    Ok(records)
}

fn source_error(path: &Path, reason: impl Into<String>) -> SkillMapError {
    SkillMapError::Source {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

fn load_json(path: &Path, source: &SourceConfig) -> Result<Vec<SourceRecord>, SkillMapError> {
    let raw = fs::read_to_string(path).map_err(|e| source_error(path, e.to_string()))?;
    let rows: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_str(&raw).map_err(|e| source_error(path, e.to_string()))?;
    Ok(rows
        .iter()
        .map(|row| SourceRecord {
            name: json_cell(row.get(&source.name_column)),
            code: json_cell(row.get(&source.code_column)),
        })
        .collect())
}

fn json_cell(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(feature = "office")]
fn load_workbook(path: &Path, source: &SourceConfig) -> Result<Vec<SourceRecord>, SkillMapError> {
    use calamine::{open_workbook_auto, DataType, Reader};

    let mut workbook = open_workbook_auto(path).map_err(|e| source_error(path, e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| source_error(path, "workbook has no worksheets"))?
        .map_err(|e| source_error(path, e.to_string()))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| source_error(path, "worksheet is empty"))?;
    let column = |wanted: &str| {
        header
            .iter()
            .position(|cell| cell.to_string().trim() == wanted)
            .ok_or_else(|| source_error(path, format!("missing column {:?}", wanted)))
    };
    let name_idx = column(&source.name_column)?;
    let code_idx = column(&source.code_column)?;

    let cell_text = |cell: Option<&DataType>| match cell {
        Some(c) if !c.is_empty() => Some(c.to_string()),
        _ => None,
    };
    Ok(rows
        .map(|row| SourceRecord {
            name: cell_text(row.get(name_idx)),
            code: cell_text(row.get(code_idx)),
        })
        .collect())
}

#[cfg(not(feature = "office"))]
fn load_workbook(path: &Path, _source: &SourceConfig) -> Result<Vec<SourceRecord>, SkillMapError> {
    Err(source_error(
        path,
        "workbook support requires the `office` feature",
    ))
}
