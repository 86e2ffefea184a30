//! End-to-end export: discovery, then fetch, parse, clean, localize and
//! render for every post, then ordered output.

use engine_logging::{engine_info, engine_warn};
use newsletter_core::{sort_chronologically, PostRecord, RunReport};

use crate::clean::ContentCleaner;
use crate::config::ExportConfig;
use crate::decode::{decode_body, DecodeError};
use crate::images::ImageLocalizer;
use crate::output::{write_output, OutputError};
use crate::page::{PageParser, ParseError, PostPageParser};
use crate::pacing::PacedFetcher;
use crate::progress::ProgressSink;
use crate::render::{collect_image_sources, ImagePolicy, MarkdownRenderer};
use crate::rules::CleanContext;
use crate::sitemap::{discover_posts, DiscoveryError, SitemapKind};
use crate::{EngineEvent, FetchError, Fetcher, ReqwestFetcher, Stage};

/// Failures that abort the whole run.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("no post URLs (matching /p/{{slug}}) found in sitemap {sitemap_url}")]
    NoPostsDiscovered { sitemap_url: String },
    #[error("none of the {discovered} discovered posts could be exported")]
    NothingExported { discovered: usize },
    #[error("failed to write output: {0}")]
    Output(#[from] OutputError),
}

/// Failures that drop a single post.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("{0}")]
    Decode(#[from] DecodeError),
    #[error("{0}")]
    Parse(#[from] ParseError),
}

pub struct Pipeline {
    config: ExportConfig,
    fetcher: Box<dyn Fetcher>,
    parser: Box<dyn PageParser>,
    cleaner: ContentCleaner,
    renderer: MarkdownRenderer,
}

impl Pipeline {
    /// Pipeline issuing real HTTP requests, paced by `config.delay`.
    pub fn new(config: ExportConfig) -> Self {
        let fetcher = ReqwestFetcher::new(config.fetch.clone());
        Self::with_fetcher(config, fetcher)
    }

    /// Pipeline over any fetcher. Every request it makes, including image
    /// downloads, still goes through one pacer.
    pub fn with_fetcher<F: Fetcher + 'static>(config: ExportConfig, fetcher: F) -> Self {
        let paced = PacedFetcher::new(fetcher, config.delay);
        Self {
            config,
            fetcher: Box::new(paced),
            parser: Box::new(PostPageParser::default()),
            cleaner: ContentCleaner::standard(),
            renderer: MarkdownRenderer::new(),
        }
    }

    pub fn with_parser(mut self, parser: Box<dyn PageParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_cleaner(mut self, cleaner: ContentCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub async fn run(&self, sink: &dyn ProgressSink) -> Result<RunReport, ExportError> {
        let mut report = RunReport::default();
        let config = &self.config;

        let discovery =
            discover_posts(self.fetcher.as_ref(), &config.base_url, &config.sitemap_path).await?;
        sink.emit(EngineEvent::SitemapFetched {
            url: discovery.sitemap_url.clone(),
            entries: discovery.entry_count,
        });
        if discovery.kind == SitemapKind::Index {
            let warning = format!(
                "{} is a sitemap index; nested sitemaps are not followed",
                discovery.sitemap_url
            );
            report.record_warning(warning);
        }
        if discovery.post_urls.is_empty() {
            return Err(ExportError::NoPostsDiscovered {
                sitemap_url: discovery.sitemap_url,
            });
        }

        let total = discovery.post_urls.len();
        report.discovered = total;
        sink.emit(EngineEvent::PostsDiscovered { count: total });

        let localizer = config.localize_images.then(|| {
            let (dir, prefix) = config.image_location();
            ImageLocalizer::new(dir, prefix)
        });

        let mut records = Vec::with_capacity(total);
        for (i, url) in discovery.post_urls.iter().enumerate() {
            sink.emit(EngineEvent::PostStarted {
                index: i + 1,
                total,
                url: url.clone(),
            });
            match self.export_post(url, localizer.as_ref(), sink, &mut report).await {
                Ok(record) => {
                    sink.emit(EngineEvent::PostCompleted {
                        url: url.clone(),
                        slug: record.slug.clone(),
                    });
                    records.push(record);
                }
                Err(err) => {
                    let reason = err.to_string();
                    sink.emit(EngineEvent::PostSkipped {
                        url: url.clone(),
                        reason: reason.clone(),
                    });
                    report.record_skip(url.as_str(), reason);
                }
            }
        }

        if records.is_empty() {
            return Err(ExportError::NothingExported { discovered: total });
        }

        sort_chronologically(&mut records);
        report.exported = records.iter().map(|record| record.url.clone()).collect();
        report.output_paths = write_output(&config.output, &records)?;

        engine_info!(
            "Exported {} of {} posts to {}",
            records.len(),
            total,
            config.output.path().display()
        );
        for line in report.skip_summary_lines() {
            engine_warn!("{}", line);
        }
        Ok(report)
    }

    async fn export_post(
        &self,
        url: &str,
        localizer: Option<&ImageLocalizer>,
        sink: &dyn ProgressSink,
        report: &mut RunReport,
    ) -> Result<PostRecord, PostError> {
        let progress = |stage| {
            sink.emit(EngineEvent::Progress {
                url: url.to_string(),
                stage,
            })
        };

        progress(Stage::Fetching);
        let output = self.fetcher.fetch(url).await?;
        let html = decode_body(&output.bytes, output.metadata.content_type.as_deref())?;

        progress(Stage::Parsing);
        let mut record = self.parser.parse(&html, url)?;

        progress(Stage::Cleaning);
        let ctx = CleanContext {
            featured_image_url: record.featured_image_url.as_deref(),
        };
        let cleaned = self.cleaner.clean(&record.content_html, &ctx);
        record.content_html = cleaned;

        if let Some(localizer) = localizer {
            progress(Stage::LocalizingImages);
            let mut urls: Vec<String> = record.featured_image_url.iter().cloned().collect();
            urls.extend(collect_image_sources(&record.content_html, Some(url)));
            let localized = localizer.localize(self.fetcher.as_ref(), &record.slug, &urls).await;
            for warning in localized.warnings {
                sink.emit(EngineEvent::Warning(warning.clone()));
                report.record_warning(warning);
            }
            record.local_image_paths = localized.manifest;
        }

        progress(Stage::Rendering);
        let policy = if localizer.is_some() {
            ImagePolicy::Localized(&record.local_image_paths)
        } else {
            ImagePolicy::Remote
        };
        record.content_markdown = self.renderer.render(&record.content_html, Some(url), policy);

        Ok(record)
    }
}
