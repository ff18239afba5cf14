use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::csv_reader::CsvData;
use crate::error::{ChartError, ChartResult};
use crate::timebucket::parse_timestamp;
use crate::value::{CellValue, Row};

/// Column type tag carried alongside the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    DateTimeField,
    CharField,
    IntegerField,
    FloatField,
    Other(String),
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "DateTimeField" => FieldType::DateTimeField,
            "CharField" => FieldType::CharField,
            "IntegerField" => FieldType::IntegerField,
            "FloatField" => FieldType::FloatField,
            _ => FieldType::Other(tag),
        }
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::DateTimeField => f.write_str("DateTimeField"),
            FieldType::CharField => f.write_str("CharField"),
            FieldType::IntegerField => f.write_str("IntegerField"),
            FieldType::FloatField => f.write_str("FloatField"),
            FieldType::Other(tag) => f.write_str(tag),
        }
    }
}

/// The tabular dataset a chart page embeds.
///
/// `fields`, `fieldtypes` and `displaynames` are parallel; the last column
/// holds the numeric measure every chart sums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceData {
    pub fields: Vec<String>,
    pub fieldtypes: Vec<FieldType>,
    #[serde(default)]
    pub displaynames: Vec<String>,
    #[serde(default)]
    pub dataset: Option<Vec<Row>>,
}

impl SourceData {
    pub fn new(fields: Vec<String>, fieldtypes: Vec<FieldType>, dataset: Vec<Row>) -> Self {
        Self {
            displaynames: fields.clone(),
            fields,
            fieldtypes,
            dataset: Some(dataset),
        }
    }

    /// Parse the embedded chart-data JSON blob.
    pub fn from_json(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(anyhow!("Chart data must be a JSON object"));
        }
        let data: SourceData =
            serde_json::from_value(value.clone()).context("Malformed chart data")?;

        if data.fields.len() != data.fieldtypes.len() {
            return Err(anyhow!(
                "Chart data has {} fields but {} field types",
                data.fields.len(),
                data.fieldtypes.len()
            ));
        }
        Ok(data)
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input).context("Chart data is not valid JSON")?;
        Self::from_json(&value)
    }

    /// Build a dataset from CSV, inferring each column's type from its cells.
    pub fn from_csv(csv: CsvData) -> Self {
        let fieldtypes: Vec<FieldType> = (0..csv.headers.len())
            .map(|col| infer_field_type(csv.rows.iter().filter_map(|r| r.get(col))))
            .collect();

        let dataset = csv
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&fieldtypes)
                    .map(|(cell, field_type)| convert_cell(cell, field_type))
                    .collect()
            })
            .collect();

        Self::new(csv.headers, fieldtypes, dataset)
    }

    /// The dataset rows, or `MissingSourceData` when the page carried none.
    pub fn rows(&self) -> ChartResult<&[Row]> {
        self.dataset.as_deref().ok_or(ChartError::MissingSourceData)
    }

    /// Index of the first column with the given type.
    pub fn first_of(&self, field_type: &FieldType) -> Option<usize> {
        self.fieldtypes.iter().position(|t| t == field_type)
    }

    pub fn has_type(&self, field_type: &FieldType) -> bool {
        self.first_of(field_type).is_some()
    }

    /// Index of the measure column (the last one).
    pub fn value_column(&self) -> usize {
        self.fields.len().saturating_sub(1)
    }

    pub fn display_name(&self, index: usize) -> Option<&str> {
        self.displaynames
            .get(index)
            .or_else(|| self.fields.get(index))
            .map(String::as_str)
    }

    /// `(index, field name)` of every datetime column.
    pub fn datetime_fields(&self) -> impl Iterator<Item = (usize, &str)> {
        self.fields
            .iter()
            .zip(&self.fieldtypes)
            .enumerate()
            .filter(|(_, (_, t))| **t == FieldType::DateTimeField)
            .map(|(i, (name, _))| (i, name.as_str()))
    }
}

fn infer_field_type<'a>(cells: impl Iterator<Item = &'a String>) -> FieldType {
    let values: Vec<&String> = cells.filter(|c| !c.is_empty()).collect();
    if values.is_empty() {
        return FieldType::CharField;
    }
    if values.iter().all(|c| c.parse::<i64>().is_ok()) {
        FieldType::IntegerField
    } else if values.iter().all(|c| c.parse::<f64>().is_ok()) {
        FieldType::FloatField
    } else if values.iter().all(|c| parse_timestamp(c).is_ok()) {
        FieldType::DateTimeField
    } else {
        FieldType::CharField
    }
}

fn convert_cell(cell: &str, field_type: &FieldType) -> CellValue {
    match field_type {
        FieldType::IntegerField | FieldType::FloatField => match cell.parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::Null,
        },
        _ => CellValue::Text(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_reader::read_csv;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let value = json!({
            "fields": ["created_at_hour_level", "kind", "count"],
            "fieldtypes": ["DateTimeField", "CharField", "IntegerField"],
            "displaynames": ["Created", "Kind", "Count"],
            "fieldsextra": [["2024-01-01", "2024-01-02"], ["web"], []],
            "dataset": [["2024-01-01T10:00:00Z", "web", 3]]
        });
        let data = SourceData::from_json(&value).unwrap();
        assert_eq!(data.fieldtypes[0], FieldType::DateTimeField);
        assert_eq!(data.rows().unwrap().len(), 1);
        assert_eq!(data.display_name(1), Some("Kind"));
        assert_eq!(data.value_column(), 2);
        assert_eq!(data.datetime_fields().collect::<Vec<_>>(), vec![(0, "created_at_hour_level")]);
    }

    #[test]
    fn test_missing_dataset() {
        let value = json!({ "fields": ["kind"], "fieldtypes": ["CharField"] });
        let data = SourceData::from_json(&value).unwrap();
        assert_eq!(data.rows().unwrap_err(), ChartError::MissingSourceData);
    }

    #[test]
    fn test_mismatched_field_types() {
        let value = json!({ "fields": ["a", "b"], "fieldtypes": ["CharField"] });
        assert!(SourceData::from_json(&value).is_err());
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(SourceData::from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_unknown_field_type_roundtrips() {
        let value = json!({ "fields": ["flag"], "fieldtypes": ["BooleanField"], "dataset": [] });
        let data = SourceData::from_json(&value).unwrap();
        assert_eq!(data.fieldtypes[0], FieldType::Other("BooleanField".to_string()));
        assert_eq!(serde_json::to_value(&data.fieldtypes).unwrap(), json!(["BooleanField"]));
    }

    #[test]
    fn test_from_csv_infers_types() {
        let csv = read_csv(
            "created,kind,ratio,count\n2024-01-01T10:00:00Z,web,0.5,3\n2024-01-02,api,1,4\n"
                .as_bytes(),
        )
        .unwrap();
        let data = SourceData::from_csv(csv);
        assert_eq!(
            data.fieldtypes,
            vec![
                FieldType::DateTimeField,
                FieldType::CharField,
                FieldType::FloatField,
                FieldType::IntegerField,
            ]
        );
        let rows = data.rows().unwrap();
        assert_eq!(rows[0][3], CellValue::Number(3.0));
        assert_eq!(rows[1][0], CellValue::from("2024-01-02"));
        assert_eq!(data.display_name(1), Some("kind"));
    }
}
