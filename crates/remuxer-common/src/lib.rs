//! Remuxer-Common: shared path utilities.
//!
//! - **Path Utilities**: detect remuxable inputs by extension
//! - **Output Naming**: derive a collision-free output path beside an input
//! - **Error Handling**: common error type and result alias
//!
//! # Examples
//!
//! ```
//! use remuxer_common::paths::is_video_file;
//! use std::path::Path;
//!
//! assert!(is_video_file(Path::new("clip.mkv")));
//! assert!(!is_video_file(Path::new("notes.txt")));
//! ```

pub mod error;
pub mod paths;

pub use error::{Error, Result};
