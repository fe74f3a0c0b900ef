use covid_monthly::analyze::parse_cli;
use covid_monthly::logging::{init_logging, LoggingConfig};
use covid_monthly::run;
use tracing::{error, info};

fn main() {
    let args = parse_cli();
    if let Err(e) = init_logging(&LoggingConfig::verbose(args.verbose)) {
        eprintln!("could not initialize logging: {}", e);
    }

    let config = match args.into_config() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!(
        "read data from {} and plot to {}",
        config.input_path.display(),
        config.output_path.display()
    );

    let analysis = match run(&config) {
        Ok(a) => a,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = analysis.figure.save(&config.output_path) {
        error!("{}", e);
        std::process::exit(1);
    }
    info!("open {} to explore the chart", config.output_path.display());
}
