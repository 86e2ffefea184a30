//! Newsletter core: the post data model and pure helpers shared by the engine and the CLI.
mod order;
mod record;
mod report;
mod slug;

pub use order::sort_chronologically;
pub use record::{push_unique, ImageEntry, ImageManifest, PostRecord};
pub use report::{RunReport, SkippedPost};
pub use slug::{is_post_url, post_slug, publication_domain};
