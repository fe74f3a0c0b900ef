use chrono::prelude::*;
use tracing::info;
pub mod aggregate;
pub mod analyze;
pub mod chart;
pub mod config;
pub mod error;
pub mod filter;
pub mod load;
pub mod logging;

pub use aggregate::{aggregate_monthly, MissingGroups, MonthlyTable};
pub use chart::{build_chart, Figure, HoverMode, Series};
pub use config::AnalysisConfig;
pub use error::{CovidError, Result};
pub use filter::{filter_countries, SelectionReport};
pub use load::{DatePolicy, RawTable};

pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

/// accepted formats for the date column, tried in order
pub const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
/// datetime formats, only the date part is kept
pub const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A calendar month, the grouping key of the monthly aggregation.
///
/// Stored as its first calendar day, so every value names a real month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    first: NaiveDate,
}

impl YearMonth {
    /// None when `month` is not in 1..=12 or the year is out of chrono's range
    pub fn new(year: i32, month: u32) -> Option<YearMonth> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| YearMonth { first })
    }

    pub fn from_date(date: NaiveDate) -> YearMonth {
        YearMonth {
            first: date - chrono::Duration::days(date.day0() as i64),
        }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    /// first calendar day of the month
    pub fn first_day(&self) -> NaiveDate {
        self.first
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

/// Parses a date or datetime string, None if no accepted format matches.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

pub fn min_and_max<T: std::cmp::PartialOrd + Copy>(s: &[T]) -> Option<(T, T)> {
    let mut self_iter = s.iter();
    let (mut min, mut max) = match self_iter.next() {
        Some(v) => (*v, *v),
        None => return None,
    };
    for es in self_iter {
        if *es > max {
            max = *es
        }
        if *es < min {
            min = *es
        }
    }
    Some((min, max))
}

/// x label format for a monthly axis spanning `d`
pub fn suitable_xfmt(d: chrono::Duration) -> &'static str {
    if d > chrono::Duration::days(3 * 365) {
        "%Y"
    } else if d > chrono::Duration::days(365) {
        "%Y-%m"
    } else {
        "%b %Y"
    }
}

/// case count with thousands separators, rounded to an integer
pub fn fmt_cases(v: f64) -> String {
    if v.is_nan() {
        return "n/a".to_string();
    }
    let digits = format!("{:.0}", v.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if v.round() < 0. {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Result of a pipeline run, every stage's output kept for reporting.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub raw_rows: usize,
    pub skipped_rows: usize,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub monthly: MonthlyTable,
    pub filtered: MonthlyTable,
    pub report: SelectionReport,
    pub figure: Figure,
}

/// Runs load, aggregation, country filter and chart building, in this order.
/// Nothing is written; save `Analysis::figure` to export the chart.
pub fn run(config: &AnalysisConfig) -> Result<Analysis> {
    info!("loading {}", config.input_path.display());
    let raw = RawTable::from_csv(&config.input_path, config.date_policy)?;
    let monthly = aggregate_monthly(&raw, config.missing_groups)?;
    let (filtered, report) = filter_countries(&monthly, &config.countries)?;
    let figure = build_chart(&filtered).with_size(config.width, config.height);
    Ok(Analysis {
        raw_rows: raw.len(),
        skipped_rows: raw.skipped_rows,
        date_range: raw.date_range(),
        monthly,
        filtered,
        report,
        figure,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_accepted_formats() {
        assert_eq!(parse_date("2020-03-15"), Some(ymd(2020, 3, 15)));
        assert_eq!(parse_date(" 2020/03/15 "), Some(ymd(2020, 3, 15)));
        assert_eq!(parse_date("03/15/2020"), Some(ymd(2020, 3, 15)));
        assert_eq!(parse_date("2020-03-15 23:59:59"), Some(ymd(2020, 3, 15)));
        assert_eq!(parse_date("2020-03-15T08:00:00"), Some(ymd(2020, 3, 15)));
    }

    #[test]
    fn rejects_garbage_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2020-13-01"), None);
        assert_eq!(parse_date("March 2020"), None);
    }

    #[test]
    fn year_month_ordering_and_display() {
        let dec = YearMonth::from_date(ymd(2020, 12, 31));
        let jan = YearMonth::from_date(ymd(2021, 1, 1));
        assert!(dec < jan);
        assert_eq!(dec.to_string(), "2020-12");
        assert_eq!(dec.first_day(), ymd(2020, 12, 1));
    }

    #[test]
    fn year_month_rejects_invalid_months() {
        assert_eq!(YearMonth::new(2020, 0), None);
        assert_eq!(YearMonth::new(2020, 13), None);
        let feb = YearMonth::new(2021, 2).unwrap();
        assert_eq!((feb.year(), feb.month()), (2021, 2));
        assert_eq!(feb.first_day(), ymd(2021, 2, 1));
        assert_eq!(feb, YearMonth::from_date(ymd(2021, 2, 28)));
    }

    #[test]
    fn min_and_max_of_empty_is_none() {
        let empty: [f64; 0] = [];
        assert_eq!(min_and_max(&empty), None);
        assert_eq!(min_and_max(&[3, 1, 2]), Some((1, 3)));
    }

    #[test]
    fn formats_case_counts() {
        assert_eq!(fmt_cases(0.), "0");
        assert_eq!(fmt_cases(20.), "20");
        assert_eq!(fmt_cases(1234.), "1,234");
        assert_eq!(fmt_cases(1234567.4), "1,234,567");
        assert_eq!(fmt_cases(-1500.), "-1,500");
        assert_eq!(fmt_cases(f64::NAN), "n/a");
    }

    #[test]
    fn xfmt_follows_span() {
        assert_eq!(suitable_xfmt(chrono::Duration::days(200)), "%b %Y");
        assert_eq!(suitable_xfmt(chrono::Duration::days(700)), "%Y-%m");
        assert_eq!(suitable_xfmt(chrono::Duration::days(2000)), "%Y");
    }
}
