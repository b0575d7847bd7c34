//! Feature alignment for diabetes model inference.
//!
//! This module turns a normalized record into the exact column layout the
//! classifier was fit on: one-hot expansion, reindex to the feature schema,
//! then the numeric/categorical split the scaler and classifier expect.

use crate::error::{PredictError, PredictResult};
use crate::schema::{indicator_column, FeatureSchema};
use crate::types::record::{CanonicalField, NormalizedRecord};
use std::collections::HashSet;
use std::sync::Arc;

/// Scaled columns, in the order the scaler was fit on.
///
/// The binary flags are scaled like the continuous columns; the frozen
/// scaler was fit on exactly these six.
pub const NUMERIC_FIELDS: [CanonicalField; 6] = [
    CanonicalField::Age,
    CanonicalField::Hypertension,
    CanonicalField::HeartDisease,
    CanonicalField::Bmi,
    CanonicalField::HbA1cLevel,
    CanonicalField::BloodGlucoseLevel,
];

/// Fields expanded into indicator columns.
pub const CATEGORICAL_FIELDS: [CanonicalField; 2] =
    [CanonicalField::Gender, CanonicalField::SmokingHistory];

/// One record reindexed to the feature schema.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow<'a> {
    schema: &'a FeatureSchema,
    values: Vec<f64>,
}

impl AlignedRow<'_> {
    /// Values in schema order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of a schema column.
    pub fn get(&self, column: &str) -> Option<f64> {
        self.schema.position(column).map(|i| self.values[i])
    }

    /// Column names in schema order.
    pub fn columns(&self) -> &[String] {
        self.schema.columns()
    }
}

/// Numeric and categorical parts of an aligned row.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRow {
    /// Unscaled values of the declared numeric columns, in declared order.
    pub numeric: Vec<f64>,
    /// Every other schema column, in schema order.
    pub categorical: Vec<f64>,
}

/// Final model input: scaled numeric columns followed by categorical ones.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVector {
    values: Vec<f64>,
}

impl EncodedVector {
    /// Concatenate scaled numeric values and categorical indicators.
    pub fn assemble(scaled_numeric: Vec<f64>, categorical: &[f64]) -> Self {
        let mut values = scaled_numeric;
        values.extend_from_slice(categorical);
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Single-precision copy for the ONNX input tensor.
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v as f32).collect()
    }
}

/// Feature extractor that transforms normalized records into model input rows.
///
/// Holds the process-wide feature schema; cheap to clone.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    schema: Arc<FeatureSchema>,
    numeric_positions: HashSet<usize>,
}

impl FeatureExtractor {
    /// Create a new feature extractor over a schema.
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        let numeric_positions = NUMERIC_FIELDS
            .iter()
            .filter_map(|field| schema.position(field.column()))
            .collect();
        Self {
            schema,
            numeric_positions,
        }
    }

    /// Declared numeric columns missing from the schema.
    pub fn missing_numeric_columns(&self) -> Vec<&'static str> {
        NUMERIC_FIELDS
            .iter()
            .map(|field| field.column())
            .filter(|column| !self.schema.contains(column))
            .collect()
    }

    /// One-hot expansion of a single record.
    ///
    /// Numeric fields keep their column names; each categorical field yields
    /// one indicator column set to 1 for the category present.
    pub fn one_hot(&self, record: &NormalizedRecord) -> Vec<(String, f64)> {
        let mut expanded = Vec::with_capacity(NUMERIC_FIELDS.len() + CATEGORICAL_FIELDS.len());

        for field in NUMERIC_FIELDS.into_iter().chain(CATEGORICAL_FIELDS) {
            if field.is_categorical() {
                if let Some(category) = record.category(field) {
                    expanded.push((indicator_column(field.column(), category), 1.0));
                }
            } else if let Some(value) = record.numeric(field) {
                expanded.push((field.column().to_string(), value));
            }
        }

        expanded
    }

    /// Reindex a record to the feature schema.
    ///
    /// Schema columns absent from the expansion are 0, expanded columns absent
    /// from the schema are dropped. Unseen categories therefore encode as all
    /// zeros for their field; this lossy handling is intentional.
    pub fn align(&self, record: &NormalizedRecord) -> AlignedRow<'_> {
        let mut values = vec![0.0; self.schema.len()];
        for (column, value) in self.one_hot(record) {
            if let Some(i) = self.schema.position(&column) {
                values[i] = value;
            }
        }
        AlignedRow {
            schema: self.schema.as_ref(),
            values,
        }
    }

    /// Split an aligned row into the declared numeric columns and the rest.
    pub fn split(&self, row: &AlignedRow<'_>) -> PredictResult<SplitRow> {
        let numeric = NUMERIC_FIELDS
            .iter()
            .map(|field| {
                row.get(field.column()).ok_or_else(|| {
                    PredictError::ScalerShape(format!(
                        "numeric column '{}' is not in the feature schema",
                        field.column()
                    ))
                })
            })
            .collect::<PredictResult<Vec<f64>>>()?;

        let categorical = row
            .values()
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.numeric_positions.contains(i))
            .map(|(_, v)| *v)
            .collect();

        Ok(SplitRow {
            numeric,
            categorical,
        })
    }

    /// Names of the declared numeric columns, in scaler order.
    pub fn numeric_columns(&self) -> [&'static str; 6] {
        NUMERIC_FIELDS.map(CanonicalField::column)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        self.schema.len()
    }

    /// Get feature names in model input order.
    pub fn feature_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.numeric_columns().to_vec();
        names.extend(
            self.schema
                .columns()
                .iter()
                .enumerate()
                .filter(|(i, _)| !self.numeric_positions.contains(i))
                .map(|(_, name)| name.as_str()),
        );
        names
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Schema the reference dataset yields, with categorical columns
    /// interleaved to exercise the reorder.
    pub(crate) fn reference_schema() -> FeatureSchema {
        FeatureSchema::new(
            [
                "age",
                "hypertension",
                "heart_disease",
                "bmi",
                "HbA1c_level",
                "blood_glucose_level",
                "gender_Female",
                "gender_Male",
                "gender_Other",
                "smoking_history_No Info",
                "smoking_history_current",
                "smoking_history_ever",
                "smoking_history_former",
                "smoking_history_never",
                "smoking_history_not current",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        )
    }

    pub(crate) fn sample_record() -> NormalizedRecord {
        NormalizedRecord {
            age: 45.0,
            hypertension: 1,
            heart_disease: 0,
            bmi: 28.5,
            hba1c_level: 6.1,
            blood_glucose_level: 140.0,
            gender: Some("Female".to_string()),
            smoking_history: Some("never".to_string()),
        }
    }

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(Arc::new(reference_schema()))
    }

    #[test]
    fn test_one_hot_expansion() {
        let expanded = extractor().one_hot(&sample_record());
        assert_eq!(expanded.len(), 8);
        assert_eq!(expanded[0], ("age".to_string(), 45.0));
        assert_eq!(expanded[6], ("gender_Female".to_string(), 1.0));
        assert_eq!(expanded[7], ("smoking_history_never".to_string(), 1.0));
    }

    #[test]
    fn test_alignment() {
        let extractor = extractor();
        let row = extractor.align(&sample_record());

        assert_eq!(row.values().len(), 15);
        assert_eq!(row.get("age"), Some(45.0));
        assert_eq!(row.get("HbA1c_level"), Some(6.1));
        assert_eq!(row.get("gender_Female"), Some(1.0));
        assert_eq!(row.get("gender_Male"), Some(0.0));
        assert_eq!(row.get("smoking_history_never"), Some(1.0));
        assert_eq!(row.values().iter().filter(|v| **v == 1.0).count(), 3);
    }

    #[test]
    fn test_alignment_is_deterministic() {
        let extractor = extractor();
        let record = sample_record();

        let first: Vec<u64> = extractor.align(&record).values().iter().map(|v| v.to_bits()).collect();
        let second: Vec<u64> = extractor.align(&record).values().iter().map(|v| v.to_bits()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_category_zero_fills() {
        let extractor = extractor();
        let mut record = sample_record();
        record.gender = Some("Nonbinary".to_string());
        record.smoking_history = Some("sometimes".to_string());

        let row = extractor.align(&record);
        for (column, value) in row.columns().iter().zip(row.values()) {
            if column.starts_with("gender_") || column.starts_with("smoking_history_") {
                assert_eq!(*value, 0.0, "{column} should be zero");
            }
        }
        assert_eq!(row.values().len(), extractor.feature_count());
    }

    #[test]
    fn test_non_text_category_never_sets_indicator() {
        let schema = FeatureSchema::new(
            [
                "age",
                "hypertension",
                "heart_disease",
                "bmi",
                "HbA1c_level",
                "blood_glucose_level",
                "gender_Female",
                "smoking_history_1",
                "smoking_history_True",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        );
        let extractor = FeatureExtractor::new(Arc::new(schema));
        let mut record = sample_record();
        record.smoking_history = None;

        let row = extractor.align(&record);
        assert_eq!(row.get("gender_Female"), Some(1.0));
        assert_eq!(row.get("smoking_history_1"), Some(0.0));
        assert_eq!(row.get("smoking_history_True"), Some(0.0));
        assert_eq!(extractor.one_hot(&record).len(), 7);
    }

    #[test]
    fn test_split_orders_numeric_then_schema_remainder() {
        let schema = FeatureSchema::new(
            [
                "gender_Female",
                "bmi",
                "gender_Male",
                "age",
                "hypertension",
                "heart_disease",
                "smoking_history_never",
                "HbA1c_level",
                "blood_glucose_level",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        );
        let extractor = FeatureExtractor::new(Arc::new(schema));
        let row = extractor.align(&sample_record());
        let split = extractor.split(&row).unwrap();

        assert_eq!(split.numeric, vec![45.0, 1.0, 0.0, 28.5, 6.1, 140.0]);
        assert_eq!(split.categorical, vec![1.0, 0.0, 1.0]);
        assert_eq!(
            extractor.feature_names(),
            vec![
                "age",
                "hypertension",
                "heart_disease",
                "bmi",
                "HbA1c_level",
                "blood_glucose_level",
                "gender_Female",
                "gender_Male",
                "smoking_history_never",
            ]
        );
    }

    #[test]
    fn test_split_missing_numeric_column() {
        let schema = FeatureSchema::new(vec!["age".to_string(), "gender_Female".to_string()]);
        let extractor = FeatureExtractor::new(Arc::new(schema));
        assert_eq!(extractor.missing_numeric_columns().len(), 5);

        let row = extractor.align(&sample_record());
        let err = extractor.split(&row).unwrap_err();
        assert!(matches!(err, PredictError::ScalerShape(_)));
    }

    #[test]
    fn test_vector_width_matches_schema() {
        let extractor = extractor();
        let row = extractor.align(&sample_record());
        let split = extractor.split(&row).unwrap();
        let vector = EncodedVector::assemble(split.numeric, &split.categorical);

        assert_eq!(vector.len(), extractor.feature_count());
        assert_eq!(vector.to_f32().len(), vector.len());
    }
}
