//! # remuxer-av
//!
//! Container remuxing with timestamp repair.
//!
//! This crate copies the audio and video streams of a media file into a new
//! container without re-encoding. Along the way it:
//! - Keeps only streams whose codec the output container handles well
//! - Rebases timestamps so the output starts at zero
//! - Repairs equal, backwards and inverted timestamps packet by packet
//!
//! ## Features
//!
//! - `native-ffmpeg` (default) - FFmpeg backend via `ffmpeg-the-third`
//! - `serde` - Serialize [`RemuxReport`] and friends
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use remuxer_av::{remux_file, RemuxOptions};
//!
//! let report = remux_file("/path/to/video.mkv", "/path/to/video.mp4", &RemuxOptions::default())?;
//! println!("Wrote {} packets", report.packets_written);
//! # Ok::<(), remuxer_av::Error>(())
//! ```

pub mod backend;
mod error;
pub mod pipeline;
mod types;

// Re-exports
pub use error::{Error, Result};
pub use pipeline::{remux, OffsetState, RemuxOptions, RemuxReport};
pub use types::{Codec, MediaKind, OutputStream, SourceStream, Timebase};

/// Remux `input` into a new container at `output`.
///
/// The output format follows the extension of `output`. If the operation
/// fails before any packet data was written, the partial output file is
/// removed.
#[cfg(feature = "native-ffmpeg")]
pub fn remux_file<P, Q>(input: P, output: Q, options: &RemuxOptions) -> Result<RemuxReport>
where
    P: AsRef<std::path::Path>,
    Q: AsRef<std::path::Path>,
{
    use backend::{FfmpegDemuxer, FfmpegMuxer};

    let (input, output) = (input.as_ref(), output.as_ref());

    #[cfg(feature = "tracing")]
    tracing::info!("Remuxing {:?} -> {:?}", input, output);

    let mut demuxer = FfmpegDemuxer::open(input)?;
    let result = FfmpegMuxer::create(output)
        .and_then(|mut muxer| remux(&mut demuxer, &mut muxer, options));

    if let Err(e) = &result {
        if !e.wrote_body() {
            discard_partial(output);
        }
    }

    result
}

#[cfg(feature = "native-ffmpeg")]
fn discard_partial(path: &std::path::Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {
            #[cfg(feature = "tracing")]
            tracing::debug!("Removed partial output {:?}", path);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Failed to remove partial output {:?}: {}", path, e);
            let _ = e; // Suppress unused warning when tracing is disabled
        }
    }
}
