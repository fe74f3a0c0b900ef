use super::VERSION;
use crate::aggregate::MissingGroups;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::load::DatePolicy;
use clap::{App, Arg, ArgMatches};
use std::ffi::OsString;
use std::path::PathBuf;

/// CLI arguments of covid_analyze; unset options fall back to the config file, then to defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub csvin: Option<PathBuf>,
    pub countries: Option<Vec<String>>,
    pub output: Option<PathBuf>,
    pub skip_invalid_dates: bool,
    pub keep_missing_months: bool,
    pub verbose: bool,
}

fn app() -> App<'static, 'static> {
    let arg_config = Arg::with_name("config")
        .help("toml file with the analysis configuration")
        .long("config")
        .takes_value(true);
    let arg_csvin = Arg::with_name("input_csvfile")
        .help("csv file with the columns country, date, total_cases")
        .short("f")
        .long("csvfile")
        .takes_value(true);
    let arg_countries = Arg::with_name("countries")
        .help("countries to plot, comma separated or repeated")
        .short("c")
        .long("countries")
        .takes_value(true)
        .multiple(true)
        .use_delimiter(true);
    let arg_output = Arg::with_name("output_file")
        .help("chart output, html or svg depending on the extension")
        .short("o")
        .long("output")
        .takes_value(true);
    let arg_skip = Arg::with_name("skip_invalid_dates")
        .help("drop rows with unparseable dates instead of failing")
        .long("skip-invalid-dates");
    let arg_keep = Arg::with_name("keep_missing_months")
        .help("keep months without any valid total_cases as gaps")
        .long("keep-missing-months");
    let arg_verbose = Arg::with_name("verbose")
        .help("print debug information")
        .short("v")
        .long("verbose");
    App::new("covid_analyze")
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about("cli app to plot the monthly evolution of COVID-19 total cases by country")
        .arg(arg_config)
        .arg(arg_csvin)
        .arg(arg_countries)
        .arg(arg_output)
        .arg(arg_skip)
        .arg(arg_keep)
        .arg(arg_verbose)
}

fn from_matches(m: &ArgMatches) -> CliArgs {
    CliArgs {
        config: m.value_of("config").map(PathBuf::from),
        csvin: m.value_of("input_csvfile").map(PathBuf::from),
        countries: m.values_of("countries").map(|vals| {
            vals.map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        }),
        output: m.value_of("output_file").map(PathBuf::from),
        skip_invalid_dates: m.is_present("skip_invalid_dates"),
        keep_missing_months: m.is_present("keep_missing_months"),
        verbose: m.is_present("verbose"),
    }
}

/// Takes the CLI arguments of the process, exits on --help or invalid input.
pub fn parse_cli() -> CliArgs {
    from_matches(&app().get_matches())
}

pub fn parse_cli_from<I, T>(args: I) -> std::result::Result<CliArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Ok(from_matches(&app().get_matches_from_safe(args)?))
}

impl CliArgs {
    /// config file (or defaults) with the CLI options on top
    pub fn into_config(self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(p) => AnalysisConfig::from_toml_file(p)?,
            None => AnalysisConfig::default(),
        };
        if let Some(csvin) = self.csvin {
            config.input_path = csvin;
        }
        if let Some(countries) = self.countries {
            config.countries = countries;
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if self.skip_invalid_dates {
            config.date_policy = DatePolicy::SkipInvalid;
        }
        if self.keep_missing_months {
            config.missing_groups = MissingGroups::Keep;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn no_arguments_gives_defaults() {
        let args = parse_cli_from(vec!["covid_analyze"]).unwrap();
        assert_eq!(args, CliArgs::default());
        assert_eq!(args.into_config().unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn countries_split_and_repeat() {
        let args = parse_cli_from(vec![
            "covid_analyze",
            "-c",
            "El Salvador,Guatemala",
            "--countries",
            "Honduras",
        ])
        .unwrap();
        assert_eq!(
            args.countries,
            Some(vec![
                "El Salvador".to_string(),
                "Guatemala".to_string(),
                "Honduras".to_string()
            ])
        );
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse_cli_from(vec![
            "covid_analyze",
            "-f",
            "owid.csv",
            "-o",
            "chart.svg",
            "--skip-invalid-dates",
            "--keep-missing-months",
        ])
        .unwrap()
        .into_config()
        .unwrap();
        assert_eq!(config.input_path, PathBuf::from("owid.csv"));
        assert_eq!(config.output_path, PathBuf::from("chart.svg"));
        assert_eq!(config.date_policy, DatePolicy::SkipInvalid);
        assert_eq!(config.missing_groups, MissingGroups::Keep);
    }

    #[test]
    fn cli_wins_over_config_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"input_path = \"from_file.csv\"\ncountries = [\"Belize\"]\n")
            .unwrap();
        let path = f.path().to_str().unwrap().to_string();
        let config = parse_cli_from(vec!["covid_analyze", "--config", path.as_str(), "-f", "cli.csv"])
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.input_path, PathBuf::from("cli.csv"));
        assert_eq!(config.countries, vec!["Belize"]);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(parse_cli_from(vec!["covid_analyze", "--bogus"]).is_err());
    }
}
