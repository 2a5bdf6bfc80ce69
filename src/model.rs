use std::fmt;

use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Identifier assigned by the store on insert.
///
/// Hosted tables use either a bigint identity column or a uuid; both are kept
/// verbatim so they round-trip into filters unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Reads an id typed by a user. Numeric text becomes `Int`, so a text id
    /// such as `"007"` only matches through `Tracker::resolve`.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => Self::Int(n),
            Err(_) => Self::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// One row of the `control` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(rename = "producto")]
    pub product: String,
    #[serde(rename = "requerimiento", default)]
    pub required: Option<i64>,
    #[serde(rename = "hecho", default)]
    pub done: Option<i64>,
    #[serde(rename = "fecha", default)]
    pub date: Option<NaiveDate>,
}

impl Record {
    pub fn fields(&self) -> RecordFields {
        RecordFields {
            product: self.product.clone(),
            required: self.required,
            done: self.done,
            date: self.date,
        }
    }

    pub fn remainder(&self) -> i64 {
        crate::aggregate::remainder(self)
    }

    pub fn is_complete(&self) -> bool {
        crate::aggregate::is_complete(self)
    }
}

/// The user-editable columns, sent on insert and update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    #[serde(rename = "producto")]
    pub product: String,
    #[serde(rename = "requerimiento")]
    pub required: Option<i64>,
    #[serde(rename = "hecho")]
    pub done: Option<i64>,
    #[serde(rename = "fecha")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("producto must not be empty")]
    EmptyProduct,

    #[error("{field} must be a non-negative integer, got {value}")]
    NegativeQuantity { field: &'static str, value: i64 },
}

impl RecordFields {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.product.trim().is_empty() {
            return Err(ValidationError::EmptyProduct);
        }
        for (field, value) in [("requerimiento", self.required), ("hecho", self.done)] {
            if let Some(value) = value.filter(|v| *v < 0) {
                return Err(ValidationError::NegativeQuantity { field, value });
            }
        }
        Ok(())
    }

    pub fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            product: self.product,
            required: self.required,
            done: self.done,
            date: self.date,
        }
    }
}

/// Field replacements for an edit; `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub product: Option<String>,
    pub required: Option<i64>,
    pub done: Option<i64>,
    pub date: Option<NaiveDate>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.product.is_none() && self.required.is_none() && self.done.is_none() && self.date.is_none()
    }

    pub fn apply(&self, current: &Record) -> RecordFields {
        RecordFields {
            product: self
                .product
                .clone()
                .unwrap_or_else(|| current.product.clone()),
            required: self.required.or(current.required),
            done: self.done.or(current.done),
            date: self.date.or(current.date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_decodes_wire_columns_with_nulls() {
        let raw = r#"{"id":7,"producto":"Tornillo","requerimiento":null,"hecho":3,"fecha":"2024-03-01"}"#;
        let record: Record = serde_json::from_str(raw).unwrap();
        assert_eq!(record.id, RecordId::Int(7));
        assert_eq!(record.product, "Tornillo");
        assert_eq!(record.required, None);
        assert_eq!(record.done, Some(3));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn record_accepts_uuid_ids_and_missing_date() {
        let raw = r#"{"id":"5b1c0d8e-2f4a-4c3e-9a77-0f1e2d3c4b5a","producto":"Tuerca","requerimiento":4,"hecho":4}"#;
        let record: Record = serde_json::from_str(raw).unwrap();
        assert_eq!(
            record.id.to_string(),
            "5b1c0d8e-2f4a-4c3e-9a77-0f1e2d3c4b5a"
        );
        assert!(record.date.is_none());
    }

    #[test]
    fn fields_serialize_with_column_names() {
        let fields = RecordFields {
            product: "Arandela".to_string(),
            required: Some(10),
            done: Some(2),
            date: NaiveDate::from_ymd_opt(2024, 1, 5),
        };
        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "producto": "Arandela",
                "requerimiento": 10,
                "hecho": 2,
                "fecha": "2024-01-05"
            })
        );
    }

    #[test]
    fn validation_rejects_blank_product_and_negative_quantities() {
        let mut fields = RecordFields {
            product: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(fields.validate(), Err(ValidationError::EmptyProduct));

        fields.product = "Perno".to_string();
        fields.done = Some(-1);
        assert_eq!(
            fields.validate(),
            Err(ValidationError::NegativeQuantity {
                field: "hecho",
                value: -1
            })
        );

        fields.done = Some(12);
        fields.required = Some(5);
        assert!(fields.validate().is_ok());
    }

    #[test]
    fn record_id_parse_prefers_integers() {
        assert_eq!(RecordId::parse(" 42 "), RecordId::Int(42));
        assert_eq!(RecordId::parse("abc"), RecordId::Text("abc".to_string()));
    }

    #[test]
    fn patch_keeps_unset_fields() {
        let current = RecordFields {
            product: "Clavo".to_string(),
            required: Some(8),
            done: Some(1),
            date: NaiveDate::from_ymd_opt(2024, 2, 2),
        }
        .into_record(RecordId::Int(1));
        let patch = RecordPatch {
            done: Some(8),
            ..Default::default()
        };
        let fields = patch.apply(&current);
        assert_eq!(fields.product, "Clavo");
        assert_eq!(fields.required, Some(8));
        assert_eq!(fields.done, Some(8));
        assert_eq!(fields.date, current.date);
    }
}
