use crate::aggregate::MonthlyTable;
use crate::error::Result;
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{info, warn};

/// Lookup outcome of one requested country name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryLookup {
    pub name: String,
    pub found: bool,
}

/// One entry per requested name, in request order, repeated names included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionReport {
    pub entries: Vec<CountryLookup>,
}

impl SelectionReport {
    /// requested names present in the data, first occurrence only
    pub fn found(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for e in self.entries.iter().filter(|e| e.found) {
            if !out.contains(&e.name.as_str()) {
                out.push(e.name.as_str());
            }
        }
        out
    }

    pub fn not_found(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.found)
            .map(|e| e.name.as_str())
            .collect()
    }

    /// true when no requested name matched, including an empty request
    pub fn is_empty_selection(&self) -> bool {
        self.entries.iter().all(|e| !e.found)
    }
}

impl std::fmt::Display for SelectionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for e in self.entries.iter() {
            if e.found {
                writeln!(f, "Found: {}", e.name)?;
            } else {
                writeln!(f, "Not found: {}", e.name)?;
            }
        }
        Ok(())
    }
}

/// Keeps the monthly rows of the requested countries that exist in the table.
/// Names match by exact, case-sensitive equality.
pub fn filter_countries(
    monthly: &MonthlyTable,
    requested: &[String],
) -> Result<(MonthlyTable, SelectionReport)> {
    let frame = monthly.to_frame()?;
    let distinct = frame
        .column("country")?
        .as_materialized_series()
        .unique()?;
    let available: HashSet<&str> = distinct.str()?.into_iter().flatten().collect();

    info!("verifying {} selected countries", requested.len());
    let mut report = SelectionReport::default();
    for name in requested.iter() {
        let found = available.contains(name.as_str());
        if found {
            info!("Found: {}", name);
        } else {
            info!("Not found: {}", name);
        }
        report.entries.push(CountryLookup {
            name: name.clone(),
            found,
        });
    }

    let present = report.found();
    let selected = Series::new("selected".into(), &present);
    let filtered = frame
        .lazy()
        .filter(col("country").is_in(lit(selected)))
        .collect()?;
    let filtered = MonthlyTable::from_frame(&filtered)?;

    if report.is_empty_selection() {
        warn!("none of the selected countries are in the data, the chart will be empty");
    }
    info!(
        "filtered data: {} records for {} countries",
        filtered.len(),
        present.len()
    );
    Ok((filtered, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::YearMonth;
    use proptest::prelude::*;

    fn monthly() -> MonthlyTable {
        let mut t = MonthlyTable::new(3);
        t.push("A", YearMonth::new(2020, 1).unwrap(), 15.);
        t.push("A", YearMonth::new(2020, 2).unwrap(), 20.);
        t.push("B", YearMonth::new(2020, 1).unwrap(), 5.);
        t
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keeps_present_and_reports_absent() {
        let (filtered, report) = filter_countries(&monthly(), &names(&["A", "C"])).unwrap();
        assert_eq!(filtered.country, vec!["A", "A"]);
        assert_eq!(filtered.total_cases, vec![15., 20.]);
        assert_eq!(
            report.entries,
            vec![
                CountryLookup { name: "A".into(), found: true },
                CountryLookup { name: "C".into(), found: false },
            ]
        );
        assert_eq!(report.to_string(), "Found: A\nNot found: C\n");
        assert!(!report.is_empty_selection());
    }

    #[test]
    fn duplicates_are_reported_twice_but_not_duplicated() {
        let (filtered, report) = filter_countries(&monthly(), &names(&["B", "B"])).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.found(), vec!["B"]);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let (filtered, report) = filter_countries(&monthly(), &names(&["a"])).unwrap();
        assert!(filtered.is_empty());
        assert_eq!(report.not_found(), vec!["a"]);
        assert!(report.is_empty_selection());
    }

    #[test]
    fn empty_request_gives_empty_output() {
        let (filtered, report) = filter_countries(&monthly(), &[]).unwrap();
        assert!(filtered.is_empty());
        assert!(report.entries.is_empty());
        assert!(report.is_empty_selection());
        assert_eq!(report.to_string(), "");
    }

    #[test]
    fn keeps_missing_months_of_selected_countries() {
        let mut t = monthly();
        t.push("B", YearMonth::new(2020, 2).unwrap(), f64::NAN);
        let (filtered, _) = filter_countries(&t, &names(&["B"])).unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.total_cases[0], 5.);
        assert!(filtered.total_cases[1].is_nan());
    }

    proptest! {
        #[test]
        fn filtering_is_idempotent(pick in prop::collection::vec(0usize..4, 0..6)) {
            let pool = ["A", "B", "C", "D"];
            let requested: Vec<String> = pick.iter().map(|&i| pool[i].to_string()).collect();
            let (once, _) = filter_countries(&monthly(), &requested).unwrap();
            let (twice, _) = filter_countries(&once, &requested).unwrap();
            prop_assert_eq!(&once.country, &twice.country);
            prop_assert_eq!(&once.year_month, &twice.year_month);
            prop_assert_eq!(&once.total_cases, &twice.total_cases);
        }

        #[test]
        fn present_countries_keep_all_rows(pick in prop::collection::vec(0usize..4, 0..6)) {
            let pool = ["A", "B", "C", "D"];
            let requested: Vec<String> = pick.iter().map(|&i| pool[i].to_string()).collect();
            let source = monthly();
            let (filtered, report) = filter_countries(&source, &requested).unwrap();
            for name in report.not_found() {
                prop_assert!(!filtered.country.iter().any(|c| c == name));
            }
            for name in report.found() {
                let want = source.country.iter().filter(|c| *c == name).count();
                let got = filtered.country.iter().filter(|c| *c == name).count();
                prop_assert_eq!(want, got);
            }
        }
    }
}
