//! Output generation: the RSS document and the files it lands in.
//!
//! # Submodules
//!
//! - [`rss`]: Serializes a [`Feed`](crate::models::Feed) to RSS 2.0 XML
//! - [`files`]: Atomic write-then-rename for cache and feed files
//!
//! # Output Structure
//!
//! ```text
//! cache_dir/
//! ├── astral.json
//! └── comics_kingdom/
//!     └── rae_the_doe.json
//!
//! feed_dir/
//! ├── astral.rss
//! └── comics_kingdom/
//!     └── rae_the_doe.rss
//! ```

pub mod files;
pub mod rss;
