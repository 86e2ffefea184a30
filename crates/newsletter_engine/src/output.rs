use std::path::PathBuf;

use engine_logging::engine_info;
use newsletter_core::PostRecord;

use crate::config::OutputMode;
use crate::filename::post_filename;
use crate::frontmatter::build_markdown_document;
use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("cannot serialize frontmatter for {url}: {source}")]
    Frontmatter {
        url: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("output path {0} has no file name")]
    InvalidPath(PathBuf),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Write `records` (already in output order) and return the paths written.
///
/// Every document is rendered before the first byte hits the disk, and each
/// file is replaced in a single rename.
pub fn write_output(mode: &OutputMode, records: &[PostRecord]) -> Result<Vec<PathBuf>, OutputError> {
    let documents = records
        .iter()
        .map(|record| {
            build_markdown_document(record)
                .map(|doc| (record, doc))
                .map_err(|source| OutputError::Frontmatter {
                    url: record.url.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    match mode {
        OutputMode::Single(path) => {
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| OutputError::InvalidPath(path.clone()))?;
            let sections: Vec<&str> = documents.iter().map(|(_, doc)| doc.as_str()).collect();
            let mut content = sections.join("\n\n");
            content.push('\n');
            let written = AtomicFileWriter::for_file(path).write(filename, content.as_bytes())?;
            engine_info!("Wrote {} posts to {}", documents.len(), written.display());
            Ok(vec![written])
        }
        OutputMode::Split(dir) => {
            let writer = AtomicFileWriter::new(dir.clone());
            let mut written = Vec::with_capacity(documents.len());
            for (record, doc) in &documents {
                let filename = post_filename(record.published_date, &record.slug);
                let mut content = doc.clone();
                content.push('\n');
                written.push(writer.write(&filename, content.as_bytes())?);
            }
            engine_info!("Wrote {} files to {}", written.len(), dir.display());
            Ok(written)
        }
    }
}
