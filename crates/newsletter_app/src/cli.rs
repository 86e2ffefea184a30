use std::path::PathBuf;

use clap::Parser;
use engine_logging::LogDestination;
use log::LevelFilter;
use newsletter_engine::{ConfigError, ExportConfig, DEFAULT_DELAY_SECS, DEFAULT_SITEMAP_PATH};

#[derive(Parser, Debug)]
#[command(name = "newsletter-export")]
#[command(about = "Export every post of a newsletter publication to Markdown")]
#[command(version)]
pub struct Cli {
    /// Publication URL (e.g. https://example.beehiiv.com or a custom domain)
    pub url: String,

    /// Output file, or directory with --split (default: <domain>-articles.md / <domain>-articles/)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write one Markdown file per post into the output directory
    #[arg(long)]
    pub split: bool,

    /// Download images (featured and inline) and link them locally
    #[arg(long)]
    pub images: bool,

    /// Seconds between the starts of two requests
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_DELAY_SECS)]
    pub delay: f64,

    /// Sitemap location relative to the publication URL
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SITEMAP_PATH)]
    pub sitemap_path: String,

    /// Log debug details
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write the log to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn to_config(&self) -> Result<ExportConfig, ConfigError> {
        Ok(ExportConfig::new(&self.url)?
            .with_output(self.output.clone(), self.split)
            .with_delay_secs(self.delay)?
            .with_sitemap_path(self.sitemap_path.clone())
            .with_images(self.images))
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsletter_engine::OutputMode;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["newsletter-export"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments parse")
    }

    #[test]
    fn defaults_follow_the_domain() {
        let cli = parse(&["https://www.example.com/"]);
        let config = cli.to_config().unwrap();
        assert_eq!(
            config.output,
            OutputMode::Single(PathBuf::from("example.com-articles.md"))
        );
        assert_eq!(config.delay, Duration::from_secs(2));
        assert_eq!(config.sitemap_path, "/sitemap.xml");
        assert!(!config.localize_images);
        assert_eq!(cli.log_level(), LevelFilter::Info);
        assert_eq!(cli.log_destination(), LogDestination::Terminal);
    }

    #[test]
    fn split_uses_a_directory() {
        let config = parse(&["https://example.com", "--split", "--images"])
            .to_config()
            .unwrap();
        assert_eq!(
            config.output,
            OutputMode::Split(PathBuf::from("example.com-articles"))
        );
        assert!(config.localize_images);
    }

    #[test]
    fn explicit_output_delay_and_sitemap() {
        let cli = parse(&[
            "https://example.com",
            "-o",
            "export",
            "--split",
            "--delay",
            "0.5",
            "--sitemap-path",
            "/sitemap-posts.xml",
            "--log-file",
            "run.log",
            "-v",
        ]);
        let config = cli.to_config().unwrap();
        assert_eq!(config.output, OutputMode::Split(PathBuf::from("export")));
        assert_eq!(config.delay, Duration::from_millis(500));
        assert_eq!(config.sitemap_path, "/sitemap-posts.xml");
        assert_eq!(cli.log_level(), LevelFilter::Debug);
        assert_eq!(
            cli.log_destination(),
            LogDestination::Both(PathBuf::from("run.log"))
        );
    }

    #[test]
    fn negative_and_out_of_range_delays_are_rejected() {
        let cli = parse(&["https://example.com", "--delay=-1"]);
        assert!(matches!(cli.to_config(), Err(ConfigError::InvalidDelay(_))));

        let cli = parse(&["https://example.com", "--delay", "1e20"]);
        assert!(matches!(cli.to_config(), Err(ConfigError::InvalidDelay(_))));
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        let argv = ["newsletter-export", "https://example.com", "-v", "-q"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn quiet_lowers_the_level() {
        assert_eq!(parse(&["https://example.com", "-q"]).log_level(), LevelFilter::Warn);
    }
}
