use std::borrow::Cow;
use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::{ChartError, ChartResult};
use crate::value::Record;

/// Order requested by the sort-direction selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    Descending,
    #[default]
    Unsorted,
}

impl FromStr for SortDirection {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ascending" => Ok(SortDirection::Ascending),
            "Descending" => Ok(SortDirection::Descending),
            "" => Ok(SortDirection::Unsorted),
            other => Err(ChartError::InvalidControlValue {
                id: "sort-direction".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Stable ascending sort on a date field.
pub fn sort_by_date(records: &[Record], field: &str) -> ChartResult<Vec<Record>> {
    let mut keyed = records
        .iter()
        .map(|r| Ok((r.get(field).as_timestamp()?, r)))
        .collect::<ChartResult<Vec<_>>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, r)| r.clone()).collect())
}

/// Stable sort on a numeric field. `Unsorted` hands back the input untouched.
///
/// Values that are not numbers sort after every number in both directions.
pub fn sort_by_number<'a>(
    records: &'a [Record],
    field: &str,
    direction: SortDirection,
) -> Cow<'a, [Record]> {
    let descending = match direction {
        SortDirection::Unsorted => return Cow::Borrowed(records),
        SortDirection::Ascending => false,
        SortDirection::Descending => true,
    };

    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        compare_numbers(a.get(field).as_number(), b.get(field).as_number(), descending)
    });
    Cow::Owned(sorted)
}

fn compare_numbers(a: f64, b: f64, descending: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if descending => b.total_cmp(&a),
        (false, false) => a.total_cmp(&b),
    }
}
