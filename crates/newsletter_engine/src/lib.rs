//! Newsletter engine: network, HTML and file IO for exporting a publication.
mod clean;
mod config;
mod decode;
mod fetch;
mod filename;
mod frontmatter;
mod hydration;
mod images;
mod jsonld;
mod output;
mod pacing;
mod page;
mod persist;
mod pipeline;
mod progress;
mod render;
mod rules;
mod sitemap;
mod types;

pub use clean::ContentCleaner;
pub use config::{
    normalize_base_url, parse_delay, ConfigError, ExportConfig, OutputMode, DEFAULT_DELAY_SECS,
};
pub use decode::{decode_body, DecodeError};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::{image_filename, post_filename};
pub use frontmatter::build_markdown_document;
pub use hydration::{extract_hydration, parse_assignment, HydrationState, HYDRATION_MARKER};
pub use images::{ImageLocalizer, LocalizedImages};
pub use jsonld::{extract_json_ld, JsonLdArticle};
pub use output::{write_output, OutputError};
pub use pacing::{PacedFetcher, Pacer};
pub use page::{
    parse_date, DateResolutionError, PageParser, ParseError, PostPageParser,
    CONTENT_CONTAINER_SELECTOR,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::{ExportError, Pipeline, PostError};
pub use progress::{ChannelProgressSink, LoggingProgressSink, NullProgressSink, ProgressSink};
pub use render::{collect_image_sources, ImagePolicy, MarkdownRenderer};
pub use rules::{
    BoilerplateRule, CleanContext, EmptyBlockRule, FooterRule, HeroImageRule, HiddenElementRule,
    ReadTimeBadgeRule, Removal, RuleKind, ShareReferralRule, SponsorRule, SubscribeCtaRule,
    TrackingPixelRule,
};
pub use sitemap::{
    discover_posts, parse_sitemap, select_post_urls, sitemap_url, Discovery, DiscoveryError,
    ParsedSitemap, SitemapKind, DEFAULT_SITEMAP_PATH,
};
pub use types::{EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, Stage};
