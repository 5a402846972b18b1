use nalgebra::DMatrix;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV writing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Column '{name}' has {actual} rows but the first column has {expected}")]
    RaggedColumns {
        name: String,
        expected: usize,
        actual: usize,
    },
}

fn csv_error(path: &Path, source: csv::Error) -> ExportError {
    ExportError::Csv {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>, ExportError> {
    csv::Writer::from_path(path).map_err(|e| csv_error(path, e))
}

/// Writes a labeled square matrix: one header row of labels, then one row per
/// label with its values. `NaN` cells are written as empty fields.
pub fn write_matrix_csv(
    path: &Path,
    matrix: &DMatrix<f64>,
    labels: &[String],
) -> Result<(), ExportError> {
    let mut w = writer(path)?;

    let mut header = Vec::with_capacity(matrix.ncols() + 1);
    header.push(String::new());
    header.extend(labels.iter().cloned());
    w.write_record(&header).map_err(|e| csv_error(path, e))?;

    for row in 0..matrix.nrows() {
        let mut record = Vec::with_capacity(matrix.ncols() + 1);
        record.push(labels.get(row).cloned().unwrap_or_default());
        for col in 0..matrix.ncols() {
            let value = matrix[(row, col)];
            record.push(if value.is_nan() {
                String::new()
            } else {
                value.to_string()
            });
        }
        w.write_record(&record).map_err(|e| csv_error(path, e))?;
    }
    w.flush().map_err(|e| ExportError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

/// Writes a single per-frame series with a `frame` index column.
pub fn write_series_csv(path: &Path, name: &str, values: &[f64]) -> Result<(), ExportError> {
    let mut w = writer(path)?;
    w.write_record(["frame", name]).map_err(|e| csv_error(path, e))?;
    for (frame, value) in values.iter().enumerate() {
        w.write_record([frame.to_string(), value.to_string()])
            .map_err(|e| csv_error(path, e))?;
    }
    w.flush().map_err(|e| ExportError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

/// Writes named columns of equal length side by side.
pub fn write_columns_csv(
    path: &Path,
    columns: &[(&str, Vec<f64>)],
) -> Result<(), ExportError> {
    if let Some((_, first)) = columns.first() {
        for (name, column) in columns.iter().skip(1) {
            if column.len() != first.len() {
                return Err(ExportError::RaggedColumns {
                    name: name.to_string(),
                    expected: first.len(),
                    actual: column.len(),
                });
            }
        }
    }

    let mut w = writer(path)?;
    let header: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    w.write_record(&header).map_err(|e| csv_error(path, e))?;

    let rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
    for row in 0..rows {
        let record: Vec<String> = columns
            .iter()
            .map(|(_, column)| column[row].to_string())
            .collect();
        w.write_record(&record).map_err(|e| csv_error(path, e))?;
    }
    w.flush().map_err(|e| ExportError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}
