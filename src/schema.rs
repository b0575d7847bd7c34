//! Feature schema derived from the reference training dataset.
//!
//! The classifier was fit on a one-hot encoded copy of the reference CSV
//! (label column removed, every category kept). This module rebuilds that
//! exact column list at startup so request rows can be reindexed to it:
//! numeric columns first in file order, then `<column>_<category>` for each
//! categorical column in file order with categories sorted lexicographically.

use anyhow::{bail, Context, Result};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Cell values treated as missing when inferring column types.
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Ordered feature columns the classifier expects.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Create a schema from an explicit column list.
    ///
    /// Duplicate names keep their first position for lookups.
    pub fn new(columns: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Self { columns, index }
    }

    /// Derive the schema from a reference CSV file.
    pub fn from_csv_path<P: AsRef<Path>>(path: P, label_column: &str) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), label = %label_column, "Deriving feature schema");

        let file = File::open(path)
            .with_context(|| format!("Failed to open reference dataset {}", path.display()))?;
        let schema = Self::from_reader(file, label_column)
            .with_context(|| format!("Failed to derive feature schema from {}", path.display()))?;

        info!(features = schema.len(), "Feature schema derived");
        debug!(columns = ?schema.columns, "Feature schema columns");
        Ok(schema)
    }

    /// Derive the schema from CSV data with a header row.
    pub fn from_reader<R: Read>(reader: R, label_column: &str) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.iter().all(String::is_empty) {
            bail!("reference dataset has no header columns");
        }

        let mut profiles: Vec<ColumnProfile> = headers
            .iter()
            .map(|name| ColumnProfile::new(name, name == label_column))
            .collect();

        let mut rows = 0usize;
        for (line, record) in csv_reader.records().enumerate() {
            let record = record.with_context(|| format!("Malformed CSV row {}", line + 2))?;
            for (profile, cell) in profiles.iter_mut().zip(record.iter()) {
                profile.observe(cell);
            }
            rows += 1;
        }

        if rows == 0 {
            bail!("reference dataset contains no data rows");
        }

        let features: Vec<&ColumnProfile> = profiles.iter().filter(|p| !p.is_label).collect();
        if features.is_empty() {
            bail!("reference dataset has no feature columns besides '{}'", label_column);
        }

        let mut columns: Vec<String> = features
            .iter()
            .filter(|p| p.numeric)
            .map(|p| p.name.clone())
            .collect();
        for profile in features.iter().filter(|p| !p.numeric) {
            columns.extend(
                profile
                    .categories
                    .iter()
                    .map(|category| indicator_column(&profile.name, category)),
            );
        }

        debug!(rows = rows, "Scanned reference dataset");
        Ok(Self::new(columns))
    }

    /// Column names in model order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of feature columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column in the schema.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Whether the schema contains a column.
    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }
}

/// Name of the indicator column for one category of a categorical field.
pub fn indicator_column(field: &str, category: &str) -> String {
    format!("{field}_{category}")
}

/// Running type inference for one CSV column.
struct ColumnProfile {
    name: String,
    is_label: bool,
    numeric: bool,
    categories: BTreeSet<String>,
}

impl ColumnProfile {
    fn new(name: &str, is_label: bool) -> Self {
        Self {
            name: name.to_string(),
            is_label,
            numeric: true,
            categories: BTreeSet::new(),
        }
    }

    fn observe(&mut self, cell: &str) {
        if self.is_label || MISSING_TOKENS.contains(&cell) {
            return;
        }
        if self.numeric && cell.trim().parse::<f64>().is_err() {
            self.numeric = false;
        }
        self.categories.insert(cell.to_string());
    }
}
