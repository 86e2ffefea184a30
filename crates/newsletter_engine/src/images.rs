use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use engine_logging::engine_debug;
use newsletter_core::ImageManifest;

use crate::filename::image_filename;
use crate::persist::AtomicFileWriter;
use crate::Fetcher;

/// Result of localizing one post's images.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocalizedImages {
    pub manifest: ImageManifest,
    /// One entry per image that kept its remote URL.
    pub warnings: Vec<String>,
}

/// Downloads images into a directory and maps each URL to a relative link.
#[derive(Debug, Clone)]
pub struct ImageLocalizer {
    writer: AtomicFileWriter,
    link_prefix: String,
}

impl ImageLocalizer {
    /// Saves into `dir`; Markdown links are `{link_prefix}/{file}`.
    pub fn new(dir: PathBuf, link_prefix: impl Into<String>) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
            link_prefix: link_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Download every URL of the post at most once.
    ///
    /// A non-empty file already present under the target name is reused
    /// without a request. Failures leave the URL out of the manifest, so the
    /// renderer keeps the remote reference.
    pub async fn localize(
        &self,
        fetcher: &dyn Fetcher,
        slug: &str,
        urls: &[String],
    ) -> LocalizedImages {
        let mut result = LocalizedImages::default();
        let mut seen = HashSet::new();
        let mut index = 0;

        for url in urls {
            if !seen.insert(url.as_str()) {
                continue;
            }
            index += 1;
            let filename = image_filename(slug, index, url);
            let link = format!("{}/{}", self.link_prefix, filename);
            let target = self.writer.dir().join(&filename);

            if is_non_empty_file(&target) {
                engine_debug!("image {} already saved as {}", url, target.display());
                result.manifest.insert(url.as_str(), link);
                continue;
            }

            match self.download(fetcher, url, &filename).await {
                Ok(path) => {
                    engine_debug!("saved image {} to {}", url, path.display());
                    result.manifest.insert(url.as_str(), link);
                }
                Err(reason) => {
                    result
                        .warnings
                        .push(format!("image {url} kept remote: {reason}"));
                }
            }
        }
        result
    }

    async fn download(
        &self,
        fetcher: &dyn Fetcher,
        url: &str,
        filename: &str,
    ) -> Result<PathBuf, String> {
        let output = fetcher.fetch(url).await.map_err(|err| err.to_string())?;
        if output.bytes.is_empty() {
            return Err("empty response".to_string());
        }
        self.writer
            .write(filename, &output.bytes)
            .map_err(|err| err.to_string())
    }
}

fn is_non_empty_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}
