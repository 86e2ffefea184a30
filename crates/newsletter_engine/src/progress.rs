use std::sync::mpsc;

use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::{EngineEvent, Stage};

/// Receives pipeline events as they happen.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

/// Forwards events to a channel; used by callers that render their own progress.
pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Writes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProgressSink;

impl ProgressSink for LoggingProgressSink {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::SitemapFetched { url, entries } => {
                engine_info!("Found {} URLs in sitemap {}", entries, url);
            }
            EngineEvent::PostsDiscovered { count } => engine_info!("Found {} posts", count),
            EngineEvent::PostStarted { index, total, url } => {
                engine_info!("[{}/{}] {}", index, total, url);
            }
            EngineEvent::Progress { url, stage } => {
                if stage != Stage::Fetching {
                    engine_debug!("{}: {}", url, stage);
                }
            }
            EngineEvent::PostCompleted { url, slug } => engine_debug!("{} done ({})", url, slug),
            EngineEvent::PostSkipped { url, reason } => {
                engine_warn!("Skipping {}: {}", url, reason);
            }
            EngineEvent::Warning(message) => engine_warn!("{}", message),
        }
    }
}
