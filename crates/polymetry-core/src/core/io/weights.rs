use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeightsError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Invalid weight value '{value}' on record {record} of '{path}'")]
    InvalidValue {
        path: String,
        record: usize,
        value: String,
    },
    #[error("Negative weight {value} on record {record} of '{path}'")]
    Negative {
        path: String,
        record: usize,
        value: f64,
    },
    #[error("Weight file '{path}' contains no values")]
    Empty { path: String },
}

/// Loads per-frame weights from the first column of a CSV file.
///
/// A single non-numeric first record is treated as a header and skipped; any
/// later non-numeric value is an error. Weights are not required to sum to 1
/// (consumers normalize), but negative values are rejected eagerly.
///
/// # Errors
///
/// Returns a [`WeightsError`] when the file cannot be read, a value cannot
/// be parsed, a weight is negative, or no values are present.
pub fn load_weights(path: &Path) -> Result<Vec<f64>, WeightsError> {
    let display_path = path.to_string_lossy().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| WeightsError::Io {
        path: display_path.clone(),
        source: e,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut weights = Vec::new();
    for (record_idx, record_res) in reader.records().enumerate() {
        let record = record_res.map_err(|e| WeightsError::Csv {
            path: display_path.clone(),
            source: e,
        })?;
        let Some(field) = record.get(0) else {
            continue;
        };
        if field.is_empty() {
            continue;
        }
        match field.parse::<f64>() {
            Ok(value) if value < 0.0 => {
                return Err(WeightsError::Negative {
                    path: display_path,
                    record: record_idx + 1,
                    value,
                });
            }
            Ok(value) => weights.push(value),
            Err(_) if record_idx == 0 => {
                // Header row.
                continue;
            }
            Err(_) => {
                return Err(WeightsError::InvalidValue {
                    path: display_path,
                    record: record_idx + 1,
                    value: field.to_string(),
                });
            }
        }
    }

    if weights.is_empty() {
        return Err(WeightsError::Empty { path: display_path });
    }
    Ok(weights)
}
