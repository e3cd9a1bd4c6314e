//! Feature schema and request-to-row assembly.
//!
//! A [`FeatureSchema`] is an ordered list of named, typed columns stored next
//! to the model artifact. [`InputLayout`] turns the JSON `features` value of a
//! request into a single-row [`FeatureFrame`] in the exact column order the
//! model was trained on.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{Result, ServeError, ValidationError};

/// Column order of the car-listing price model.
pub const CAR_LISTING_COLUMNS: [&str; 19] = [
    "Brand",
    "Type",
    "Reg_year",
    "Reg_month",
    "Days_since_registration",
    "Coe_left",
    "Depreciation",
    "Mileage",
    "Road_Tax",
    "Dereg_Value",
    "COE",
    "Engine_Capacity",
    "Curb_Weight",
    "Manufactured",
    "Transmission",
    "OMV",
    "ARF",
    "Power",
    "Number_of_Owners",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    /// Encoded as the index of the value in `categories`.
    Categorical { categories: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(flatten)]
    pub kind: ColumnKind,
}

impl Column {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Numeric,
        }
    }

    /// Coerce one JSON value into the column's numeric encoding.
    fn coerce(&self, value: &Value) -> std::result::Result<f64, ValidationError> {
        match &self.kind {
            ColumnKind::Numeric => coerce_number(&self.name, value),
            ColumnKind::Categorical { categories } => match value {
                Value::String(s) => categories
                    .iter()
                    .position(|c| c == s.trim())
                    .map(|idx| idx as f64)
                    .ok_or_else(|| ValidationError::UnknownCategory {
                        field: self.name.clone(),
                        value: value.to_string(),
                    }),
                Value::Number(n) => match n.as_f64() {
                    Some(code)
                        if code.fract() == 0.0
                            && code >= 0.0
                            && (code as usize) < categories.len() =>
                    {
                        Ok(code)
                    }
                    _ => Err(ValidationError::UnknownCategory {
                        field: self.name.clone(),
                        value: value.to_string(),
                    }),
                },
                _ => Err(ValidationError::UnknownCategory {
                    field: self.name.clone(),
                    value: value.to_string(),
                }),
            },
        }
    }
}

/// Ordered `(name, kind)` pairs describing the model's input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub columns: Vec<Column>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let schema = Self { columns };
        schema.validate().map_err(ServeError::InvalidConfig)?;
        Ok(schema)
    }

    /// Built-in 19-column layout of the car-listing model, all numeric.
    pub fn car_listing() -> Self {
        Self {
            columns: CAR_LISTING_COLUMNS.iter().map(|c| Column::numeric(*c)).collect(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let schema: Self = serde_json::from_str(&content)?;
        schema.validate().map_err(|e| {
            ServeError::InvalidConfig(format!(
                "schema {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Ok(schema)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.columns.is_empty() {
            return Err("schema must declare at least one column".to_string());
        }
        let mut seen = HashSet::new();
        for (idx, col) in self.columns.iter().enumerate() {
            if col.name.trim().is_empty() {
                return Err(format!("column[{idx}] name must not be empty"));
            }
            if !seen.insert(col.name.as_str()) {
                return Err(format!("duplicate column name `{}`", col.name));
            }
            if let ColumnKind::Categorical { categories } = &col.kind {
                if categories.is_empty() {
                    return Err(format!("categorical column `{}` has no categories", col.name));
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn assemble_positional(
        &self,
        items: &[Value],
    ) -> std::result::Result<Vec<f64>, ValidationError> {
        if items.len() != self.columns.len() {
            return Err(ValidationError::Length {
                expected: self.columns.len(),
                got: items.len(),
            });
        }
        self.columns
            .iter()
            .zip(items)
            .map(|(col, v)| col.coerce(v))
            .collect()
    }

    fn assemble_named(
        &self,
        fields: &serde_json::Map<String, Value>,
    ) -> std::result::Result<Vec<f64>, ValidationError> {
        let index: HashMap<&str, &Column> =
            self.columns.iter().map(|c| (c.name.as_str(), c)).collect();
        if let Some(unknown) = fields.keys().find(|k| !index.contains_key(k.as_str())) {
            return Err(ValidationError::UnknownColumn(unknown.clone()));
        }
        self.columns
            .iter()
            .map(|col| {
                let value = fields
                    .get(&col.name)
                    .ok_or_else(|| ValidationError::MissingColumn(col.name.clone()))?;
                col.coerce(value)
            })
            .collect()
    }
}

/// A single row of model input, optionally labeled with column names.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    pub columns: Option<Vec<String>>,
    pub values: Vec<f64>,
}

impl FeatureFrame {
    pub fn unlabeled(values: Vec<f64>) -> Self {
        Self {
            columns: None,
            values,
        }
    }

    pub fn labeled(columns: Vec<String>, values: Vec<f64>) -> Self {
        Self {
            columns: Some(columns),
            values,
        }
    }

    pub fn width(&self) -> usize {
        self.values.len()
    }
}

/// How the `features` value of a request maps onto the model input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputLayout {
    /// Positional numeric array reshaped to `1 x expected`.
    Raw { expected: usize },
    /// Values mapped onto named schema columns.
    Labeled(FeatureSchema),
}

impl InputLayout {
    pub fn name(&self) -> &'static str {
        match self {
            InputLayout::Raw { .. } => "raw",
            InputLayout::Labeled(_) => "labeled",
        }
    }

    pub fn width(&self) -> usize {
        match self {
            InputLayout::Raw { expected } => *expected,
            InputLayout::Labeled(schema) => schema.len(),
        }
    }

    pub fn is_labeled(&self) -> bool {
        matches!(self, InputLayout::Labeled(_))
    }

    /// Build the model row from a request's `features` value.
    pub fn assemble(
        &self,
        features: &Value,
    ) -> std::result::Result<FeatureFrame, ValidationError> {
        match self {
            InputLayout::Raw { expected } => {
                let items = features.as_array().ok_or_else(|| ValidationError::WrongType {
                    field: "features".to_string(),
                    expected: "an array of numbers",
                })?;
                if items.len() != *expected {
                    return Err(ValidationError::Length {
                        expected: *expected,
                        got: items.len(),
                    });
                }
                let values = items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| match v {
                        Value::Number(n) => n.as_f64().ok_or_else(|| ValidationError::NotNumeric {
                            field: format!("features[{i}]"),
                            value: v.to_string(),
                        }),
                        _ => Err(ValidationError::NotNumeric {
                            field: format!("features[{i}]"),
                            value: v.to_string(),
                        }),
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(FeatureFrame::unlabeled(values))
            }
            InputLayout::Labeled(schema) => {
                let values = match features {
                    Value::Array(items) => schema.assemble_positional(items)?,
                    Value::Object(fields) => schema.assemble_named(fields)?,
                    _ => {
                        return Err(ValidationError::WrongType {
                            field: "features".to_string(),
                            expected: "an array or an object keyed by column name",
                        })
                    }
                };
                Ok(FeatureFrame::labeled(schema.names(), values))
            }
        }
    }
}

fn coerce_number(field: &str, value: &Value) -> std::result::Result<f64, ValidationError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        // Form inputs arrive as strings.
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    };
    parsed.ok_or_else(|| ValidationError::NotNumeric {
        field: field.to_string(),
        value: value.to_string(),
    })
}
