use remuxer_av::RemuxOptions;
use remuxer_common::paths::{video_extensions, DEFAULT_OUTPUT_EXTENSION};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub remux: RemuxConfig,

    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemuxConfig {
    /// Packets read ahead before writing starts (must be at least 1)
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,

    /// Move the MP4 index to the front of the file
    #[serde(default = "default_faststart")]
    pub faststart: bool,

    /// Extension of remuxed outputs, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_lookahead() -> usize {
    remuxer_av::pipeline::DEFAULT_LOOKAHEAD
}

fn default_faststart() -> bool {
    true
}

fn default_extension() -> String {
    DEFAULT_OUTPUT_EXTENSION.to_string()
}

impl Default for RemuxConfig {
    fn default() -> Self {
        Self {
            lookahead: default_lookahead(),
            faststart: default_faststart(),
            extension: default_extension(),
        }
    }
}

impl RemuxConfig {
    pub fn options(&self) -> RemuxOptions {
        RemuxOptions {
            lookahead: self.lookahead,
            faststart: self.faststart,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Concurrent remux operations; 0 means one per available core.
    /// Values above the core count are capped.
    #[serde(default)]
    pub max_jobs: usize,

    /// Input extensions picked up by directory discovery
    #[serde(default = "default_batch_extensions")]
    pub extensions: Vec<String>,
}

fn default_batch_extensions() -> Vec<String> {
    video_extensions().iter().map(|e| e.to_string()).collect()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_jobs: 0,
            extensions: default_batch_extensions(),
        }
    }
}
