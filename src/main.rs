use clap::Parser;
use std::panic;
use tracing::{error, info};

use fhir_cache_probe::{
    AppError, RunOptions,
    config::{Cli, load_config_with},
    demographics::render_report,
    logging::init_logging,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config_with(&cli) {
        Ok(config) => config,
        Err(e) => {
            let err = AppError::Config(format!("{e:#}"));
            eprintln!("{err}");
            std::process::exit(err.exit_code());
        }
    };

    // Initialize logging FIRST
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {e:#}");
        std::process::exit(AppError::from(e).exit_code());
    }

    // NOW set up panic handler (so it can use logging)
    panic::set_hook(Box::new(|panic_info| {
        error!(?panic_info, "FATAL: Panic occurred");
        std::process::exit(1);
    }));

    info!(
        environment = config.environment.as_str(),
        base_url = %config.server.base_url,
        filter_list = %config.batch.filter_list_path,
        "FHIR cache probe starting up"
    );

    let options = RunOptions {
        demographic_report: !cli.skip_report,
    };
    match fhir_cache_probe::run(&config, options).await {
        Ok(report) => {
            if let Some(people) = &report.people {
                println!("{}", render_report(people));
            }
            println!("{}", report.comparison);
        }
        Err(err) => {
            error!(error = %err, "Probe run failed");
            eprintln!("Error: {err}");
            std::process::exit(err.exit_code());
        }
    }
}
