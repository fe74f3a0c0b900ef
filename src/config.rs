//! Explicit configuration of a pipeline run

use crate::aggregate::MissingGroups;
use crate::error::{CovidError, Result};
use crate::load::DatePolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_INPUT: &str = "covid.csv";
pub const DEFAULT_OUTPUT: &str = "covid_monthly.html";
pub const DEFAULT_COUNTRIES: [&str; 3] = ["El Salvador", "Guatemala", "Honduras"];

/// Everything the pipeline needs, passed to [`crate::run`].
///
/// Every key is optional in a toml file; missing keys keep their default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// csv with at least the columns country, date, total_cases
    pub input_path: PathBuf,
    /// exact-match country names, in report order
    pub countries: Vec<String>,
    pub date_policy: DatePolicy,
    pub missing_groups: MissingGroups,
    /// .html or .svg chart output
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT),
            countries: DEFAULT_COUNTRIES.iter().map(|c| c.to_string()).collect(),
            date_policy: DatePolicy::default(),
            missing_groups: MissingGroups::default(),
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            width: crate::chart::DEFAULT_SIZE.0,
            height: crate::chart::DEFAULT_SIZE.1,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_file(fin: impl AsRef<Path>) -> Result<AnalysisConfig> {
        let fin = fin.as_ref();
        let content =
            std::fs::read_to_string(fin).map_err(|e| CovidError::data_access(fin, e))?;
        Self::from_toml_str(&content).map_err(|message| CovidError::Config {
            path: fin.to_path_buf(),
            message,
        })
    }

    /// parses and validates, returning the problem as a message
    pub fn from_toml_str(content: &str) -> std::result::Result<AnalysisConfig, String> {
        let config: AnalysisConfig = toml::from_str(content).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "chart size must be positive, got {}x{}",
                self.width, self.height
            ));
        }
        if self.input_path.as_os_str().is_empty() {
            return Err("input_path is empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_original_run() {
        let config = AnalysisConfig::default();
        assert_eq!(config.input_path, PathBuf::from("covid.csv"));
        assert_eq!(config.countries, vec!["El Salvador", "Guatemala", "Honduras"]);
        assert_eq!(config.date_policy, DatePolicy::Strict);
        assert_eq!(config.missing_groups, MissingGroups::Drop);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            countries = ["Belize", "Panama"]
            date_policy = "skip-invalid"
            "#,
        )
        .unwrap();
        assert_eq!(config.countries, vec!["Belize", "Panama"]);
        assert_eq!(config.date_policy, DatePolicy::SkipInvalid);
        assert_eq!(config.input_path, PathBuf::from(DEFAULT_INPUT));
        assert_eq!(config.width, 1280);
    }

    #[test]
    fn full_toml() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            input_path = "data/owid.csv"
            countries = []
            date_policy = "strict"
            missing_groups = "keep"
            output_path = "out.svg"
            width = 800
            height = 400
            "#,
        )
        .unwrap();
        assert!(config.countries.is_empty());
        assert_eq!(config.missing_groups, MissingGroups::Keep);
        assert_eq!(config.output_path, PathBuf::from("out.svg"));
        assert_eq!((config.width, config.height), (800, 400));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(AnalysisConfig::from_toml_str("colour = \"red\"").is_err());
        assert!(AnalysisConfig::from_toml_str("date_policy = \"lenient\"").is_err());
        assert!(AnalysisConfig::from_toml_str("width = 0").is_err());
    }

    #[test]
    fn file_errors_carry_the_path() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"width = \"wide\"").unwrap();
        match AnalysisConfig::from_toml_file(f.path()) {
            Err(CovidError::Config { path, .. }) => assert_eq!(path, f.path()),
            other => panic!("expected config error, got {:?}", other),
        }
        let missing = AnalysisConfig::from_toml_file("/definitely/not/here.toml");
        assert!(matches!(missing, Err(CovidError::DataAccess { .. })));
    }
}
