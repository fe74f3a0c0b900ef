use crate::error::Result;
use crate::load::RawTable;
use crate::YearMonth;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// What to do with a (country, month) group whose counts are all missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingGroups {
    #[default]
    Drop,
    /// keep the group with a NAN count
    Keep,
}

/// One row of a `MonthlyTable`, borrowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyRecord<'a> {
    pub country: &'a str,
    pub year_month: YearMonth,
    pub total_cases: f64,
    pub date: NaiveDate,
}

/// Monthly case counts, one entry per (country, year_month),
/// ordered by country and then month.
#[derive(Debug, Clone, Default)]
pub struct MonthlyTable {
    pub country: Vec<String>,
    pub year_month: Vec<YearMonth>,
    pub total_cases: Vec<f64>,
    /// first day of `year_month`, used as the plotting x value
    pub date: Vec<NaiveDate>,
}

impl MonthlyTable {
    pub fn new(capacity: usize) -> MonthlyTable {
        MonthlyTable {
            country: Vec::with_capacity(capacity),
            year_month: Vec::with_capacity(capacity),
            total_cases: Vec::with_capacity(capacity),
            date: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, country: impl Into<String>, year_month: YearMonth, total_cases: f64) {
        self.country.push(country.into());
        self.year_month.push(year_month);
        self.total_cases.push(total_cases);
        self.date.push(year_month.first_day());
    }

    pub fn len(&self) -> usize {
        self.country.len()
    }

    pub fn is_empty(&self) -> bool {
        self.country.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = MonthlyRecord<'_>> {
        self.country
            .iter()
            .zip(self.year_month.iter())
            .zip(self.total_cases.iter())
            .zip(self.date.iter())
            .map(|(((c, &ym), &w), &d)| MonthlyRecord {
                country: c.as_str(),
                year_month: ym,
                total_cases: w,
                date: d,
            })
    }

    /// distinct country values, in table order
    pub fn countries(&self) -> Vec<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        self.country
            .iter()
            .map(|c| c.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Columns country, year_month (first day, Date) and total_cases
    /// (Float64, null where missing).
    pub fn to_frame(&self) -> Result<DataFrame> {
        let first_days: Vec<NaiveDate> = self.year_month.iter().map(|ym| ym.first_day()).collect();
        let df = DataFrame::new(vec![
            Column::new("country".into(), &self.country),
            DateChunked::from_naive_date("year_month".into(), first_days)
                .into_series()
                .into(),
            Column::new("total_cases".into(), nan_to_null(&self.total_cases)),
        ])?;
        Ok(df)
    }

    /// Inverse of `to_frame`; null counts become NAN.
    pub fn from_frame(df: &DataFrame) -> Result<MonthlyTable> {
        let country = df.column("country")?.as_materialized_series().str()?;
        let year_month = df.column("year_month")?.as_materialized_series().date()?;
        let total_cases = df.column("total_cases")?.as_materialized_series().f64()?;

        let mut monthly = MonthlyTable::new(df.height());
        let rows = country
            .into_iter()
            .zip(year_month.as_date_iter())
            .zip(total_cases.into_iter());
        for ((c, d), w) in rows {
            if let (Some(c), Some(d)) = (c, d) {
                monthly.push(c, YearMonth::from_date(d), w.unwrap_or(f64::NAN));
            }
        }
        Ok(monthly)
    }
}

pub(crate) fn nan_to_null(values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|&w| if w.is_nan() { None } else { Some(w) })
        .collect()
}

/// Groups the raw rows by (country, year_month) and keeps the maximum
/// total_cases of each group, ignoring missing values.
pub fn aggregate_monthly(raw: &RawTable, missing: MissingGroups) -> Result<MonthlyTable> {
    let grouped = raw
        .to_frame()?
        .lazy()
        .group_by([col("country"), col("year_month")])
        .agg([col("total_cases").max()]);
    let all_missing = grouped
        .clone()
        .filter(col("total_cases").is_null())
        .collect()?
        .height();
    let grouped = match missing {
        MissingGroups::Keep => grouped,
        MissingGroups::Drop => {
            if all_missing > 0 {
                debug!("dropping {} monthly groups", all_missing);
            }
            grouped.filter(col("total_cases").is_not_null())
        }
    };
    let out = grouped
        .collect()?
        .sort(["country", "year_month"], SortMultipleOptions::default())?;
    let monthly = MonthlyTable::from_frame(&out)?;

    if all_missing > 0 {
        info!("{} monthly groups without any valid total_cases", all_missing);
    }
    info!(
        "aggregated {} rows into {} monthly records",
        raw.len(),
        monthly.len()
    );
    Ok(monthly)
}
