use std::path::{Path, PathBuf};
use std::time::Duration;

use newsletter_core::publication_domain;
use url::Url;

use crate::sitemap::DEFAULT_SITEMAP_PATH;
use crate::FetchSettings;

pub const DEFAULT_DELAY_SECS: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base url {0:?}")]
    InvalidBaseUrl(String),
    #[error("base url must use http or https, got {0:?}")]
    UnsupportedScheme(String),
    #[error("delay must be a non-negative number of seconds within range, got {0}")]
    InvalidDelay(f64),
}

/// Where posts are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// One aggregated Markdown document.
    Single(PathBuf),
    /// One Markdown file per post inside this directory.
    Split(PathBuf),
}

impl OutputMode {
    /// Default output for `domain`: `<domain>-articles.md` or `<domain>-articles/`.
    pub fn default_for(domain: &str, split: bool) -> Self {
        if split {
            OutputMode::Split(PathBuf::from(format!("{domain}-articles")))
        } else {
            OutputMode::Single(PathBuf::from(format!("{domain}-articles.md")))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            OutputMode::Single(path) | OutputMode::Split(path) => path,
        }
    }

    /// Directory localized images are saved to, and the prefix Markdown uses
    /// to reference them relative to the written document.
    pub fn image_location(&self, domain: &str) -> (PathBuf, String) {
        match self {
            OutputMode::Split(dir) => (dir.join("images"), "images".to_string()),
            OutputMode::Single(file) => {
                let prefix = format!("{domain}-images");
                let parent = file.parent().unwrap_or_else(|| Path::new(""));
                (parent.join(&prefix), prefix)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub base_url: Url,
    /// `host` with a leading `www.` removed.
    pub domain: String,
    pub sitemap_path: String,
    pub output: OutputMode,
    pub localize_images: bool,
    /// Minimum time between the starts of two requests.
    pub delay: Duration,
    pub fetch: FetchSettings,
}

impl ExportConfig {
    /// Config with defaults for everything but the base URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(base_url)?;
        let domain = publication_domain(&base_url)
            .ok_or_else(|| ConfigError::InvalidBaseUrl(base_url.to_string()))?;
        Ok(Self {
            output: OutputMode::default_for(&domain, false),
            base_url,
            domain,
            sitemap_path: DEFAULT_SITEMAP_PATH.to_string(),
            localize_images: false,
            delay: Duration::from_secs_f64(DEFAULT_DELAY_SECS),
            fetch: FetchSettings::default(),
        })
    }

    /// Select split or single output, at `path` or the default location.
    pub fn with_output(mut self, path: Option<PathBuf>, split: bool) -> Self {
        self.output = match (path, split) {
            (Some(path), true) => OutputMode::Split(path),
            (Some(path), false) => OutputMode::Single(path),
            (None, split) => OutputMode::default_for(&self.domain, split),
        };
        self
    }

    pub fn with_delay_secs(mut self, secs: f64) -> Result<Self, ConfigError> {
        self.delay = parse_delay(secs)?;
        Ok(self)
    }

    pub fn with_sitemap_path(mut self, path: impl Into<String>) -> Self {
        self.sitemap_path = path.into();
        self
    }

    pub fn with_images(mut self, localize: bool) -> Self {
        self.localize_images = localize;
        self
    }

    pub fn with_fetch_settings(mut self, settings: FetchSettings) -> Self {
        self.fetch = settings;
        self
    }

    pub fn image_location(&self) -> (PathBuf, String) {
        self.output.image_location(&self.domain)
    }
}

/// Parse the publication URL, dropping trailing slashes from its path.
pub fn normalize_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|_| ConfigError::InvalidBaseUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidBaseUrl(raw.to_string()));
    }
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

pub fn parse_delay(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ConfigError::InvalidDelay(secs));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidDelay(secs))
}
