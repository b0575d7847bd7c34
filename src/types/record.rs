//! Patient record data structures and key normalization

use crate::error::{PredictError, PredictResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw request body: attribute name to JSON value, in either key dialect
pub type RawRecord = Map<String, Value>;

/// Canonical semantic attributes the model was trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Age,
    Hypertension,
    HeartDisease,
    Bmi,
    HbA1cLevel,
    BloodGlucoseLevel,
    Gender,
    SmokingHistory,
}

impl CanonicalField {
    /// Column name used in the training data
    pub fn column(self) -> &'static str {
        match self {
            CanonicalField::Age => "age",
            CanonicalField::Hypertension => "hypertension",
            CanonicalField::HeartDisease => "heart_disease",
            CanonicalField::Bmi => "bmi",
            CanonicalField::HbA1cLevel => "HbA1c_level",
            CanonicalField::BloodGlucoseLevel => "blood_glucose_level",
            CanonicalField::Gender => "gender",
            CanonicalField::SmokingHistory => "smoking_history",
        }
    }

    /// Accepted request keys, highest priority first
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            CanonicalField::Age => &["age"],
            CanonicalField::Hypertension => &["hypertension"],
            CanonicalField::HeartDisease => &["heart_disease"],
            CanonicalField::Bmi => &["bmi"],
            CanonicalField::HbA1cLevel => &["hba1c_level", "HbA1c_level"],
            CanonicalField::BloodGlucoseLevel => &["blood_glucose_level", "glucose"],
            CanonicalField::Gender => &["gender"],
            CanonicalField::SmokingHistory => &["smoking_history", "smoking"],
        }
    }

    /// Whether the field is one-hot encoded rather than scaled
    pub fn is_categorical(self) -> bool {
        matches!(self, CanonicalField::Gender | CanonicalField::SmokingHistory)
    }

    /// Resolve the field from a raw record.
    ///
    /// The first alias holding a truthy value wins. When none is truthy the
    /// last alias is taken as-is, so a lone `0` is still a value while an
    /// absent key is not.
    pub fn resolve(self, raw: &RawRecord) -> Option<&Value> {
        let aliases = self.aliases();
        aliases
            .iter()
            .filter_map(|key| raw.get(*key))
            .find(|value| is_truthy(value))
            .or_else(|| aliases.last().and_then(|key| raw.get(*key)))
            .filter(|value| !value.is_null())
    }
}

/// Canonical patient record with the 8 model attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub age: f64,
    pub hypertension: i64,
    pub heart_disease: i64,
    pub bmi: f64,
    #[serde(rename = "HbA1c_level")]
    pub hba1c_level: f64,
    pub blood_glucose_level: f64,
    /// `None` when the request sent a number or boolean; encodes as all zeros
    pub gender: Option<String>,
    pub smoking_history: Option<String>,
}

impl NormalizedRecord {
    /// Build a canonical record from a raw request body
    pub fn from_raw(raw: &RawRecord) -> PredictResult<Self> {
        Ok(Self {
            age: float_field(raw, CanonicalField::Age)?,
            hypertension: int_field(raw, CanonicalField::Hypertension)?,
            heart_disease: int_field(raw, CanonicalField::HeartDisease)?,
            bmi: float_field(raw, CanonicalField::Bmi)?,
            hba1c_level: float_field(raw, CanonicalField::HbA1cLevel)?,
            blood_glucose_level: float_field(raw, CanonicalField::BloodGlucoseLevel)?,
            gender: categorical_field(raw, CanonicalField::Gender)?,
            smoking_history: categorical_field(raw, CanonicalField::SmokingHistory)?,
        })
    }

    /// Build a canonical record from any JSON value (must be an object)
    pub fn from_json(value: &Value) -> PredictResult<Self> {
        match value {
            Value::Object(raw) => Self::from_raw(raw),
            other => Err(PredictError::Validation(format!(
                "request body must be a JSON object, got {}",
                json_type_name(other)
            ))),
        }
    }

    /// Numeric value of a scaled field, `None` for categorical fields
    pub fn numeric(&self, field: CanonicalField) -> Option<f64> {
        match field {
            CanonicalField::Age => Some(self.age),
            CanonicalField::Hypertension => Some(self.hypertension as f64),
            CanonicalField::HeartDisease => Some(self.heart_disease as f64),
            CanonicalField::Bmi => Some(self.bmi),
            CanonicalField::HbA1cLevel => Some(self.hba1c_level),
            CanonicalField::BloodGlucoseLevel => Some(self.blood_glucose_level),
            CanonicalField::Gender | CanonicalField::SmokingHistory => None,
        }
    }

    /// Category of a categorical field, `None` for numeric fields and for
    /// categories that were not sent as text
    pub fn category(&self, field: CanonicalField) -> Option<&str> {
        match field {
            CanonicalField::Gender => self.gender.as_deref(),
            CanonicalField::SmokingHistory => self.smoking_history.as_deref(),
            _ => None,
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn required(raw: &RawRecord, field: CanonicalField) -> PredictResult<&Value> {
    field.resolve(raw).ok_or_else(|| {
        PredictError::Validation(format!(
            "missing required field '{}' (accepted keys: {})",
            field.column(),
            field.aliases().join(", ")
        ))
    })
}

fn invalid(field: CanonicalField, value: &Value, expected: &str) -> PredictError {
    PredictError::Validation(format!(
        "field '{}' must be {}, got {}",
        field.column(),
        expected,
        value
    ))
}

fn float_field(raw: &RawRecord, field: CanonicalField) -> PredictResult<f64> {
    let value = required(raw, field)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(field, value, "a number"))
}

fn int_field(raw: &RawRecord, field: CanonicalField) -> PredictResult<i64> {
    let value = required(raw, field)?;
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(field, value, "an integer"))
}

/// Text categories pass through. Numbers and booleans never name an indicator
/// column, so they resolve to no category at all.
fn categorical_field(raw: &RawRecord, field: CanonicalField) -> PredictResult<Option<String>> {
    let value = required(raw, field)?;
    match value {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(_) | Value::Bool(_) => Ok(None),
        _ => Err(invalid(field, value, "a string")),
    }
}
