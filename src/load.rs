use crate::aggregate::nan_to_null;
use crate::error::{CovidError, Result};
use crate::{parse_date, YearMonth};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// What to do with a row whose date cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatePolicy {
    /// fail the whole load on the first invalid date
    #[default]
    Strict,
    /// drop the row and keep loading
    SkipInvalid,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    country: String,
    date: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    total_cases: Option<f64>,
}

/// The daily case-count table, one entry per csv row, stored column-wise.
/// Missing counts are NAN.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub country: Vec<String>,
    pub date: Vec<NaiveDate>,
    pub total_cases: Vec<f64>,
    pub year_month: Vec<YearMonth>,
    /// rows dropped while loading: no country, no date, or an invalid
    /// date under `DatePolicy::SkipInvalid`
    pub skipped_rows: usize,
}

impl RawTable {
    pub fn new(capacity: usize) -> RawTable {
        RawTable {
            country: Vec::with_capacity(capacity),
            date: Vec::with_capacity(capacity),
            total_cases: Vec::with_capacity(capacity),
            year_month: Vec::with_capacity(capacity),
            skipped_rows: 0,
        }
    }

    /// appends a row, deriving its year-month key from the date
    pub fn push(&mut self, country: impl Into<String>, date: NaiveDate, total_cases: f64) {
        self.country.push(country.into());
        self.year_month.push(YearMonth::from_date(date));
        self.date.push(date);
        self.total_cases.push(total_cases);
    }

    pub fn len(&self) -> usize {
        self.date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_empty()
    }

    /// Init a RawTable from a csv file with at least the columns
    /// country, date and total_cases; other columns are ignored.
    pub fn from_csv(fin: impl AsRef<Path>, policy: DatePolicy) -> Result<RawTable> {
        let fin = fin.as_ref();
        let content = std::fs::read(fin).map_err(|e| CovidError::data_access(fin, e))?;
        debug!("read {} bytes from {}", content.len(), fin.display());
        RawTable::from_reader(&content[..], policy)
    }

    /// Same as `from_csv` over any reader.
    /// Empty or non-numeric total_cases are stored as NAN.
    /// Rows with an empty country or an empty date are dropped and counted
    /// whatever the policy; other dates go through `parse_date` and a failure
    /// is handled according to `policy`.
    pub fn from_reader<R: std::io::Read>(reader: R, policy: DatePolicy) -> Result<RawTable> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        let mut table = RawTable::new(1024);
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let row: CsvRow = record.deserialize(Some(&headers))?;
            if row.country.trim().is_empty() {
                debug!("skipping line {} without country", line);
                table.skipped_rows += 1;
                continue;
            }
            if row.date.trim().is_empty() {
                debug!("skipping line {} without date", line);
                table.skipped_rows += 1;
                continue;
            }
            match parse_date(&row.date) {
                Some(date) => {
                    table.push(row.country, date, row.total_cases.unwrap_or(f64::NAN));
                }
                None => match policy {
                    DatePolicy::Strict => {
                        return Err(CovidError::Parse {
                            line,
                            value: row.date,
                        })
                    }
                    DatePolicy::SkipInvalid => {
                        warn!("skipping line {} with invalid date {:?}", line, row.date);
                        table.skipped_rows += 1;
                    }
                },
            }
        }

        match table.date_range() {
            Some((min, max)) => {
                info!("dates converted, {} rows", table.len());
                info!("date range: {} to {}", min, max);
            }
            None => warn!("no rows with a valid date were loaded"),
        }
        if table.skipped_rows > 0 {
            warn!("{} rows skipped for a missing or invalid country or date", table.skipped_rows);
        }
        Ok(table)
    }

    /// Columns country, date, year_month (first day of the month) and
    /// total_cases (null where missing), ready for grouping.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let first_days: Vec<NaiveDate> = self.year_month.iter().map(|ym| ym.first_day()).collect();
        let df = DataFrame::new(vec![
            Column::new("country".into(), &self.country),
            DateChunked::from_naive_date("date".into(), self.date.iter().copied())
                .into_series()
                .into(),
            DateChunked::from_naive_date("year_month".into(), first_days)
                .into_series()
                .into(),
            Column::new("total_cases".into(), nan_to_null(&self.total_cases)),
        ])?;
        Ok(df)
    }

    /// earliest and latest date, None for an empty table
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        crate::min_and_max(&self.date[..])
    }
}
