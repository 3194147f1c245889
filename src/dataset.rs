//! Loading (feature, target) pairs from CSV.
use crate::table::{Table, TableError};
use ordered_float::OrderedFloat;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DatasetOptions {
    feature: String,
    target: String,
    sort: bool,
}

impl DatasetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feature(mut self, column: impl Into<String>) -> Self {
        self.feature = column.into();
        self
    }

    pub fn target(mut self, column: impl Into<String>) -> Self {
        self.target = column.into();
        self
    }

    /// Whether records are sorted by the feature after loading (on by default).
    pub fn sort(mut self, enabled: bool) -> Self {
        self.sort = enabled;
        self
    }

    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<Dataset, LoadError> {
        let file = File::open(path)?;
        self.load(BufReader::new(file))
    }

    pub fn load<R: io::Read>(&self, reader: R) -> Result<Dataset, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let column_index = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| LoadError::MissingColumn {
                    name: name.to_owned(),
                })
        };
        let feature_index = column_index(self.feature.as_str())?;
        let target_index = column_index(self.target.as_str())?;

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            let parse = |index: usize, column: &str| {
                let raw = record.get(index).unwrap_or("");
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| LoadError::InvalidValue {
                        column: column.to_owned(),
                        row: row + 1,
                        value: raw.to_owned(),
                    })
            };
            records.push((
                parse(feature_index, self.feature.as_str())?,
                parse(target_index, self.target.as_str())?,
            ));
        }

        if self.sort {
            records.sort_by_key(|&(x, _)| OrderedFloat(x));
        }
        let (feature, target): (Vec<f64>, Vec<f64>) = records.into_iter().unzip();
        tracing::debug!(
            feature = %self.feature,
            target = %self.target,
            sorted = self.sort,
            "loaded dataset"
        );

        Ok(Dataset::new(&self.feature, &self.target, feature, target)?)
    }
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            feature: "lstat".to_owned(),
            target: "medv".to_owned(),
            sort: true,
        }
    }
}

/// Owned feature and target columns.
#[derive(Debug, Clone)]
pub struct Dataset {
    feature_name: String,
    target_name: String,
    feature: Vec<f64>,
    target: Vec<f64>,
}

impl Dataset {
    pub fn new(
        feature_name: impl Into<String>,
        target_name: impl Into<String>,
        feature: Vec<f64>,
        target: Vec<f64>,
    ) -> Result<Self, TableError> {
        Table::new(&feature, &target)?;
        Ok(Self {
            feature_name: feature_name.into(),
            target_name: target_name.into(),
            feature,
            target,
        })
    }

    pub fn feature_name(&self) -> &str {
        &self.feature_name
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn feature(&self) -> &[f64] {
        &self.feature
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }

    pub fn len(&self) -> usize {
        self.feature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature.is_empty()
    }

    pub fn table(&self) -> Result<Table<'_>, TableError> {
        Table::new(&self.feature, &self.target)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("malformed CSV")]
    Csv(#[from] csv::Error),

    #[error("column {name:?} not found")]
    MissingColumn { name: String },

    #[error("row {row}: column {column:?} has a non-numeric or non-finite value {value:?}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}
