use std::collections::HashMap;
use tracing::debug;

use crate::error::ChartResult;
use crate::timebucket::{truncate, Granularity};
use crate::value::{CellValue, Record};

const KEY_SEPARATOR: &str = "|";

/// Which field to bucket by time, and at what granularity.
#[derive(Debug, Clone, PartialEq)]
pub struct DateAggregation {
    pub field: String,
    pub level: Granularity,
}

impl DateAggregation {
    pub fn new(field: impl Into<String>, level: Granularity) -> Self {
        Self {
            field: field.into(),
            level,
        }
    }
}

/// Sum `value_field` over records sharing the same group key.
///
/// The group key joins the non-falsy values of `group_fields` and, when
/// `date_aggregation` is given, the record's period start. Output records
/// carry the group fields, the bucketed date field and the sum, in the order
/// their keys were first seen. An empty input or unset value field yields
/// an empty result.
pub fn aggregate(
    records: &[Record],
    value_field: Option<&str>,
    group_fields: &[&str],
    date_aggregation: Option<&DateAggregation>,
) -> ChartResult<Vec<Record>> {
    let value_field = match value_field {
        Some(field) if !field.is_empty() && !records.is_empty() => field,
        _ => return Ok(Vec::new()),
    };

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut aggregated: Vec<(Record, f64)> = Vec::new();

    for record in records {
        let period_start = match date_aggregation {
            Some(agg) => {
                let ts = record.get(&agg.field).as_timestamp()?;
                Some(CellValue::Date(truncate(&ts, agg.level)?))
            }
            None => None,
        };

        let key = group_key(record, group_fields, period_start.as_ref());
        let value = record.get(value_field).as_number();

        let idx = *positions.entry(key).or_insert_with(|| {
            let mut seed = Record::new();
            for field in group_fields {
                seed.set(*field, record.get(field).clone());
            }
            seed.set(value_field, CellValue::Number(0.0));
            if let (Some(agg), Some(start)) = (date_aggregation, &period_start) {
                seed.set(agg.field.as_str(), start.clone());
            }
            aggregated.push((seed, 0.0));
            aggregated.len() - 1
        });

        aggregated[idx].1 += value;
    }

    debug!(input = records.len(), groups = aggregated.len(), "aggregated records");

    Ok(aggregated
        .into_iter()
        .map(|(mut record, sum)| {
            record.set(value_field, CellValue::Number(sum));
            record
        })
        .collect())
}

fn group_key(record: &Record, group_fields: &[&str], period_start: Option<&CellValue>) -> String {
    group_fields
        .iter()
        .map(|field| record.get(field))
        .chain(period_start)
        .filter(|value| !value.is_falsy())
        .map(CellValue::key_text)
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}
