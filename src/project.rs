use crate::mapping::FieldMapping;
use crate::value::{CellValue, Record, Row};

/// Reshape positional rows into named records according to `mapping`.
///
/// Produces exactly one record per row, in row order. An index past the end
/// of a row yields [`CellValue::Missing`] for that field.
pub fn project(rows: &[Row], mapping: &FieldMapping) -> Vec<Record> {
    rows.iter()
        .map(|row| {
            let mut record = Record::new();
            for (name, index) in mapping.iter() {
                record.set(name, row.get(index).cloned().unwrap_or_default());
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_selects_columns() {
        let rows = vec![vec![CellValue::from("a"), CellValue::from(1.0), CellValue::from(2.5)]];
        let mapping = FieldMapping::from_pairs([("x", 0), ("y", 2)]);
        let records = project(&rows, &mapping);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], Record::new().with("x", "a").with("y", 2.5));
    }

    #[test]
    fn test_project_out_of_range_is_missing() {
        let rows = vec![vec![CellValue::from("a")]];
        let mapping = FieldMapping::from_pairs([("x", 0), ("y", 5)]);
        let records = project(&rows, &mapping);
        assert_eq!(records[0].get("y"), &CellValue::Missing);
    }

    #[test]
    fn test_project_preserves_order_and_count() {
        let rows: Vec<Row> = (0..5).map(|i| vec![CellValue::from(i as f64)]).collect();
        let mapping = FieldMapping::from_pairs([("v", 0)]);
        let records = project(&rows, &mapping);
        let values: Vec<f64> = records.iter().map(|r| r.get("v").as_number()).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }
}
