//! Dataset loading and feature extraction.
//!
//! `load_data` reads the clinical CSV into a column-oriented `DataTable`,
//! translating the textual `sex` encoding into its numeric code.
//! `split_features_target` slices the table into the fixed-order feature
//! matrix and the binary target vector consumed by the model.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{HeartError, Result};

/// Dataset columns that make up the feature vector, in model order.
pub const FEATURE_COLUMNS: [&str; 7] = [
    "age",
    "sex",
    "chest_pain",
    "rest_bp",
    "chol",
    "max_hr",
    "st_depr",
];

pub const TARGET_COLUMN: &str = "heart_disease";

pub const N_FEATURES: usize = FEATURE_COLUMNS.len();

const SEX_COLUMN: &str = "sex";

/// Column-oriented numeric table as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    headers: Vec<String>,
    columns: Vec<Vec<f64>>,
    n_rows: usize,
}

impl DataTable {
    pub fn new(headers: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self> {
        if headers.len() != columns.len() {
            return Err(HeartError::InvalidConfig(format!(
                "{} headers for {} columns",
                headers.len(),
                columns.len()
            )));
        }
        let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        if let Some((name, col)) = headers
            .iter()
            .zip(columns.iter())
            .find(|(_, c)| c.len() != n_rows)
        {
            return Err(HeartError::InvalidConfig(format!(
                "column '{}' has {} values, expected {}",
                name,
                col.len(),
                n_rows
            )));
        }
        Ok(Self {
            headers,
            columns,
            n_rows,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn nrows(&self) -> usize {
        self.n_rows
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.headers
            .iter()
            .position(|h| h == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    fn require_column(&self, name: &str) -> Result<&[f64]> {
        self.column(name)
            .ok_or_else(|| HeartError::MissingColumn(name.to_string()))
    }
}

/// Map a textual `sex` value to its numeric code ("male" → 0, "female" → 1).
pub fn encode_sex(value: &str) -> Option<f64> {
    match value.trim().to_lowercase().as_str() {
        "male" => Some(0.0),
        "female" => Some(1.0),
        _ => None,
    }
}

/// Load the heart disease dataset from a CSV (or TSV) file.
///
/// Only the feature and target columns are kept; any other column (an id or
/// free-text note, say) is skipped unparsed. Numeric `sex` codes are kept
/// as-is; "male"/"female" are translated to 0/1. Any other non-numeric value
/// in the `sex` column is rejected, as is a non-numeric value in any other
/// kept column. Absent columns are reported by `split_features_target`.
pub fn load_data<P: AsRef<Path>>(path: P) -> Result<DataTable> {
    let path = path.as_ref();
    let is_tsv = path.extension().map(|e| e == "tsv").unwrap_or(false);
    let delimiter = if is_tsv { b'\t' } else { b',' };

    let csv_err = |source: csv::Error| HeartError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|e| HeartError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    // (position in the file, header) for every column the model reads.
    let kept: Vec<(usize, String)> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .enumerate()
        .filter(|(_, h)| FEATURE_COLUMNS.contains(h) || *h == TARGET_COLUMN)
        .map(|(idx, h)| (idx, h.to_string()))
        .collect();

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); kept.len()];
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let row = row_idx + 1;
        for (slot, (col_idx, header)) in kept.iter().enumerate() {
            let raw = record.get(*col_idx).unwrap_or("");
            let value = match raw.parse::<f64>() {
                Ok(v) => v,
                Err(_) if header == SEX_COLUMN => {
                    encode_sex(raw).ok_or_else(|| HeartError::UnknownCategory {
                        row,
                        column: header.clone(),
                        value: raw.to_string(),
                    })?
                }
                Err(_) => {
                    return Err(HeartError::ParseValue {
                        row,
                        column: header.clone(),
                        value: raw.to_string(),
                    })
                }
            };
            columns[slot].push(value);
        }
    }

    let headers = kept.into_iter().map(|(_, h)| h).collect();
    let table = DataTable::new(headers, columns)?;
    log::debug!(
        "Loaded {} rows x {} columns from {}",
        table.nrows(),
        table.headers().len(),
        path.display()
    );
    Ok(table)
}

/// Split a table into the feature matrix (fixed column order) and the 0/1
/// target vector.
pub fn split_features_target(table: &DataTable) -> Result<(Array2<f64>, Array1<usize>)> {
    let feature_cols = FEATURE_COLUMNS
        .iter()
        .map(|name| table.require_column(name))
        .collect::<Result<Vec<_>>>()?;
    let target = table.require_column(TARGET_COLUMN)?;

    let n_rows = table.nrows();
    let x = Array2::from_shape_fn((n_rows, N_FEATURES), |(r, c)| feature_cols[c][r]);

    let y = target
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if v == 0.0 {
                Ok(0usize)
            } else if v == 1.0 {
                Ok(1usize)
            } else {
                Err(HeartError::InvalidLabel { row: i + 1, value: v })
            }
        })
        .collect::<Result<Array1<usize>>>()?;

    Ok((x, y))
}

/// Reject NaN and infinite values in a feature vector in model column order.
pub fn ensure_finite(values: &[f64]) -> Result<()> {
    match values
        .iter()
        .zip(FEATURE_COLUMNS.iter())
        .find(|(v, _)| !v.is_finite())
    {
        Some((&value, &feature)) => Err(HeartError::NonFiniteFeature {
            feature: feature.to_string(),
            value,
        }),
        None => Ok(()),
    }
}

/// A single patient's clinical features, named as the serving layer and CLI
/// expose them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PatientRecord {
    /// Age in years
    pub age: f64,
    /// 0 = male, 1 = female
    pub sex: f64,
    /// Ordinal chest pain type (0-3)
    pub chest_pain: f64,
    /// Resting blood pressure (mm Hg)
    pub blood_pressure: f64,
    /// Serum cholesterol (mg/dl)
    pub cholesterol: f64,
    /// Maximum heart rate achieved
    pub max_hr: f64,
    /// ST depression induced by exercise
    pub st_depression: f64,
}

impl PatientRecord {
    /// Feature vector in model column order.
    #[must_use]
    pub fn to_array(&self) -> [f64; N_FEATURES] {
        [
            self.age,
            self.sex,
            self.chest_pain,
            self.blood_pressure,
            self.cholesterol,
            self.max_hr,
            self.st_depression,
        ]
    }

    /// Build a record from a feature vector in model column order. Every
    /// value must be finite.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.len() != N_FEATURES {
            return Err(HeartError::FeatureCount {
                expected: N_FEATURES,
                got: values.len(),
            });
        }
        ensure_finite(values)?;
        Ok(Self {
            age: values[0],
            sex: values[1],
            chest_pain: values[2],
            blood_pressure: values[3],
            cholesterol: values[4],
            max_hr: values[5],
            st_depression: values[6],
        })
    }
}
