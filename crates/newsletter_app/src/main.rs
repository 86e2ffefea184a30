//! `newsletter-export`: export a newsletter publication's posts to Markdown.
mod cli;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use engine_logging::{engine_error, engine_info, engine_warn};
use newsletter_core::RunReport;
use newsletter_engine::{LoggingProgressSink, Pipeline};

use crate::cli::Cli;

const PERMISSION_NOTICE: &str = "Note: this tool is for exporting content you own or have permission to use.\n      Respect copyright and the site's terms of service.";

fn main() -> ExitCode {
    let cli = Cli::parse();
    if !engine_logging::initialize(cli.log_destination(), cli.log_level()) {
        eprintln!("Warning: logging could not be initialized");
    }

    match run(&cli) {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            engine_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<RunReport> {
    println!("{PERMISSION_NOTICE}\n");

    let config = cli.to_config().context("invalid arguments")?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let pipeline = Pipeline::new(config);
    let report = runtime.block_on(pipeline.run(&LoggingProgressSink))?;
    Ok(report)
}

fn print_summary(report: &RunReport) {
    for path in &report.output_paths {
        engine_info!("Wrote {}", path.display());
    }
    if report.has_problems() {
        engine_warn!(
            "Finished with {} skipped posts and {} warnings",
            report.skipped.len(),
            report.warnings.len()
        );
    }
}
