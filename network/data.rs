//! # Data Loading and Filtering
//!
//! Exclusive entry point for user-provided observation tables. Reads a
//! delimited text file, validates it against the caller's schema, performs
//! listwise deletion of incomplete rows, and produces the `ndarray`
//! structures the estimators consume.
//!
//! - The column layout is caller-defined: an identifier column, named binary
//!   symptom indicator columns grouped by category, and one integer count
//!   covariate.
//! - Rows containing a missing or non-finite value in any modeled column are
//!   dropped, not repaired. After filtering, no missing values remain.
//! - Structural failures (missing file, missing column, non-numeric data)
//!   are hard errors; incompleteness of individual rows is not.

use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

/// One named category of symptom indicator columns.
#[derive(Debug, Clone)]
pub struct SymptomGroup {
    /// Category label, e.g. "depression".
    pub name: String,
    /// Column names belonging to this category, in file order.
    pub columns: Vec<String>,
}

impl SymptomGroup {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// The expected column layout of an observation file.
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Name of the identifier column.
    pub id_column: String,
    /// Symptom indicator columns, grouped by category.
    pub symptom_groups: Vec<SymptomGroup>,
    /// Name of the integer count covariate column.
    pub covariate_column: String,
    /// Field separator byte; defaults to tab.
    pub separator: u8,
}

impl TableSchema {
    pub fn new(id_column: &str, symptom_groups: Vec<SymptomGroup>, covariate_column: &str) -> Self {
        Self {
            id_column: id_column.to_string(),
            symptom_groups,
            covariate_column: covariate_column.to_string(),
            separator: b'\t',
        }
    }

    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    /// All symptom column names in schema order.
    pub fn symptom_columns(&self) -> Vec<String> {
        self.symptom_groups
            .iter()
            .flat_map(|g| g.columns.iter().cloned())
            .collect()
    }
}

/// A complete-case observation table ready for network estimation.
#[derive(Debug)]
pub struct ObservationTable {
    /// Identifier of each retained row.
    pub ids: Vec<String>,
    /// Symptom column names, in schema order.
    pub symptom_names: Vec<String>,
    /// Half-open column ranges of `symptoms` covered by each category.
    pub group_ranges: Vec<(String, Range<usize>)>,
    /// Binary symptom indicators. Shape: [n_retained, n_symptoms].
    pub symptoms: Array2<f64>,
    /// The count covariate for each retained row.
    pub covariate: Array1<f64>,
    /// Number of rows removed by listwise deletion.
    pub rows_dropped: usize,
}

impl ObservationTable {
    /// Number of retained observations.
    pub fn n_observations(&self) -> usize {
        self.symptoms.nrows()
    }

    /// Number of symptom variables.
    pub fn n_symptoms(&self) -> usize {
        self.symptoms.ncols()
    }

    /// Index of a symptom column by name.
    pub fn symptom_index(&self, name: &str) -> Option<usize> {
        self.symptom_names.iter().position(|n| n == name)
    }

    /// The symptom column indices belonging to a named category.
    pub fn group_indices(&self, name: &str) -> Option<Vec<usize>> {
        self.group_ranges
            .iter()
            .find(|(g, _)| g == name)
            .map(|(_, range)| range.clone().collect())
    }
}

/// All data loading and validation failures.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error(
        "The required column '{column_name}' could not be converted to the expected type '{expected_type}'. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error(
        "Symptom column '{column}' contains the non-binary value {value} at data row {row}. Symptom indicators must be coded 0/1."
    )]
    NotBinary {
        column: String,
        value: f64,
        row: usize,
    },
    #[error(
        "Covariate column '{column}' contains {value} at data row {row}, which is not a non-negative integer count."
    )]
    NotACount {
        column: String,
        value: f64,
        row: usize,
    },
    #[error("The column '{0}' appears more than once in the schema.")]
    DuplicateColumn(String),
    #[error("The schema names no symptom columns.")]
    NoSymptomColumns,
    #[error("No complete rows remain after listwise deletion ({dropped} rows dropped).")]
    NoCompleteRows { dropped: usize },
}

/// Loads an observation file and applies listwise deletion.
///
/// Any row with a missing (`NA`/empty) or non-finite value in a symptom or
/// covariate column is removed. The number of removed rows is logged and
/// recorded on the returned table.
pub fn load_observations(path: &str, schema: &TableSchema) -> Result<ObservationTable, DataError> {
    internal::load(path, schema)
}

/// Internal module for the loading pipeline.
mod internal {
    use super::*;

    pub(super) fn load(path: &str, schema: &TableSchema) -> Result<ObservationTable, DataError> {
        validate_schema(schema)?;

        log::info!("Loading observations from '{path}'");
        let df = CsvReader::new(File::open(Path::new(path))?)
            .with_options(
                CsvReadOptions::default().with_has_header(true).with_parse_options(
                    CsvParseOptions::default()
                        .with_separator(schema.separator)
                        .with_null_values(Some(NullValues::AllColumnsSingle("NA".into()))),
                ),
            )
            .finish()?;

        let symptom_columns = schema.symptom_columns();
        let mut required: Vec<&str> = Vec::with_capacity(symptom_columns.len() + 2);
        required.push(schema.id_column.as_str());
        required.extend(symptom_columns.iter().map(|s| s.as_str()));
        required.push(schema.covariate_column.as_str());

        let present: HashSet<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        for name in &required {
            if !present.contains(*name) {
                return Err(DataError::ColumnNotFound((*name).to_string()));
            }
        }

        // Pull every modeled column out as Option<f64> so incomplete rows can
        // be identified before any array is materialized.
        let mut modeled: Vec<Vec<Option<f64>>> = Vec::with_capacity(symptom_columns.len() + 1);
        for name in symptom_columns.iter().chain(std::iter::once(&schema.covariate_column)) {
            modeled.push(extract_optional_column(&df, name)?);
        }

        let n_raw = df.height();
        let keep: Vec<usize> = (0..n_raw)
            .filter(|&row| {
                modeled
                    .iter()
                    .all(|col| matches!(col[row], Some(v) if v.is_finite()))
            })
            .collect();
        let rows_dropped = n_raw - keep.len();
        if keep.is_empty() {
            return Err(DataError::NoCompleteRows {
                dropped: rows_dropped,
            });
        }
        if rows_dropped > 0 {
            log::warn!(
                "Listwise deletion removed {rows_dropped} of {n_raw} rows containing missing values."
            );
        } else {
            log::info!("All {n_raw} rows are complete; nothing dropped.");
        }

        // Symptom matrix, validated to 0/1 coding.
        let n_symptoms = symptom_columns.len();
        let mut symptoms = Array2::zeros((keep.len(), n_symptoms));
        for (j, name) in symptom_columns.iter().enumerate() {
            for (out_row, &raw_row) in keep.iter().enumerate() {
                let value = modeled[j][raw_row].unwrap_or(f64::NAN);
                if value != 0.0 && value != 1.0 {
                    return Err(DataError::NotBinary {
                        column: name.clone(),
                        value,
                        row: raw_row + 1,
                    });
                }
                symptoms[[out_row, j]] = value;
            }
        }

        // Count covariate, validated to non-negative whole numbers.
        let covariate_values = &modeled[n_symptoms];
        let mut covariate = Array1::zeros(keep.len());
        for (out_row, &raw_row) in keep.iter().enumerate() {
            let value = covariate_values[raw_row].unwrap_or(f64::NAN);
            if value < 0.0 || value.fract() != 0.0 {
                return Err(DataError::NotACount {
                    column: schema.covariate_column.clone(),
                    value,
                    row: raw_row + 1,
                });
            }
            covariate[out_row] = value;
        }

        let ids = extract_ids(&df, &schema.id_column, &keep)?;

        let mut group_ranges = Vec::with_capacity(schema.symptom_groups.len());
        let mut offset = 0;
        for group in &schema.symptom_groups {
            let end = offset + group.columns.len();
            group_ranges.push((group.name.clone(), offset..end));
            offset = end;
        }

        log::info!(
            "Loaded {} complete observations over {} symptom indicators in {} categories.",
            keep.len(),
            n_symptoms,
            group_ranges.len()
        );

        Ok(ObservationTable {
            ids,
            symptom_names: symptom_columns,
            group_ranges,
            symptoms,
            covariate,
            rows_dropped,
        })
    }

    fn validate_schema(schema: &TableSchema) -> Result<(), DataError> {
        let symptom_columns = schema.symptom_columns();
        if symptom_columns.is_empty() {
            return Err(DataError::NoSymptomColumns);
        }
        let mut seen = HashSet::new();
        for name in symptom_columns
            .iter()
            .chain([&schema.id_column, &schema.covariate_column])
        {
            if !seen.insert(name.clone()) {
                return Err(DataError::DuplicateColumn(name.clone()));
            }
        }
        Ok(())
    }

    /// Casts one column to f64, preserving nulls as `None`.
    fn extract_optional_column(
        df: &DataFrame,
        column_name: &str,
    ) -> Result<Vec<Option<f64>>, DataError> {
        let series = df.column(column_name)?;
        let casted = match series.cast(&DataType::Float64) {
            Ok(casted) => casted,
            Err(_) => {
                return Err(DataError::ColumnWrongType {
                    column_name: column_name.to_string(),
                    expected_type: "f64 (numeric)",
                    found_type: format!("{:?}", series.dtype()),
                });
            }
        };
        // A cast that manufactures nulls from non-null input means the column
        // held non-numeric text rather than missing values.
        if casted.null_count() > series.null_count() {
            return Err(DataError::ColumnWrongType {
                column_name: column_name.to_string(),
                expected_type: "f64 (numeric)",
                found_type: format!("{:?}", series.dtype()),
            });
        }
        let chunked = casted.f64()?.rechunk();
        Ok(chunked.into_iter().collect())
    }

    /// Identifier values for the retained rows, rendered as strings.
    fn extract_ids(
        df: &DataFrame,
        id_column: &str,
        keep: &[usize],
    ) -> Result<Vec<String>, DataError> {
        let series = df.column(id_column)?;
        let mut ids = Vec::with_capacity(keep.len());
        for &row in keep {
            let value = series.get(row).unwrap_or(AnyValue::Null);
            ids.push(match value {
                AnyValue::Null => (row + 1).to_string(),
                _ => {
                    let text = value.to_string();
                    let trimmed = text.trim_matches('"').to_string();
                    if trimmed.is_empty() {
                        (row + 1).to_string()
                    } else {
                        trimmed
                    }
                }
            });
        }
        Ok(ids)
    }
}
