use tracing::debug;

use crate::error::ChartResult;
use crate::timebucket::{end_of_day, parse_timestamp, Timestamp};
use crate::value::{CellValue, Record};

/// Field name -> allowed values. A record passes when every listed field
/// holds one of its allowed values.
pub type LabelCriteria = Vec<(String, Vec<CellValue>)>;

/// Field name -> inclusive date range.
pub type DateCriteria = Vec<(String, DateRange)>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DateRange {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

impl DateRange {
    pub fn new(start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        Self { start, end }
    }

    /// Build a range from raw date-input text.
    ///
    /// Empty or unparseable inputs leave that side unbounded. The end bound
    /// covers its whole day.
    pub fn from_inputs(start: &str, end: &str) -> ChartResult<Self> {
        let start = parse_timestamp(start).ok();
        let end = match parse_timestamp(end) {
            Ok(ts) => Some(end_of_day(&ts)?),
            Err(_) => None,
        };
        Ok(Self { start, end })
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, ts: &Timestamp) -> bool {
        self.start.map_or(true, |start| *ts >= start) && self.end.map_or(true, |end| *ts <= end)
    }
}

/// Keep the records matching both the label and the date criteria.
///
/// Missing or empty criteria match everything. A record whose date field
/// cannot be read as a timestamp fails the whole call.
pub fn filter(
    records: &[Record],
    label_criteria: Option<&LabelCriteria>,
    date_criteria: Option<&DateCriteria>,
) -> ChartResult<Vec<Record>> {
    let mut kept = Vec::new();

    for record in records {
        let label_matches = label_criteria.map_or(true, |criteria| {
            criteria
                .iter()
                .all(|(field, allowed)| allowed.contains(record.get(field)))
        });

        let date_matches = match date_criteria {
            Some(criteria) => {
                let mut matches = true;
                for (field, range) in criteria {
                    let ts = record.get(field).as_timestamp()?;
                    matches = matches && range.contains(&ts);
                }
                matches
            }
            None => true,
        };

        if label_matches && date_matches {
            kept.push(record.clone());
        }
    }

    debug!(input = records.len(), kept = kept.len(), "filtered records");
    Ok(kept)
}
