use anyhow::{Context, Result};
use std::io::{self, Read};

/// Raw CSV contents: a header row plus string cells.
#[derive(Debug, Clone)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read CSV data from stdin
pub fn read_csv_from_stdin() -> Result<CsvData> {
    read_csv(io::stdin().lock())
}

/// Read CSV data from any reader. The first record is the header row.
pub fn read_csv<R: Read>(reader: R) -> Result<CsvData> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() {
        anyhow::bail!("CSV must have a header row");
    }

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", idx + 1))?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }

    if rows.is_empty() {
        anyhow::bail!("CSV must contain at least one data row");
    }

    Ok(CsvData { headers, rows })
}
