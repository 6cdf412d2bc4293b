//! Native FFmpeg backend using ffmpeg-the-third bindings.
//!
//! Every FFmpeg resource here is owned by an RAII wrapper (`Input`,
//! `Output`, `Packet`, `Dictionary`), so early returns release them.

use super::{CodedPacket, Demuxer, Muxer, ReadStatus};
use crate::{Codec, Error, MediaKind, Result, SourceStream, Timebase};
use ffmpeg_the_third as ffmpeg;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static FFMPEG_INIT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

fn init_ffmpeg() -> Result<()> {
    FFMPEG_INIT
        .get_or_init(|| {
            ffmpeg::init().map_err(|e| e.to_string())?;
            ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Error);
            Ok(())
        })
        .clone()
        .map_err(|e| Error::InvalidInput(format!("FFmpeg initialisation failed: {}", e)))
}

impl From<ffmpeg::Rational> for Timebase {
    fn from(rational: ffmpeg::Rational) -> Self {
        Timebase::new(rational.numerator(), rational.denominator())
    }
}

impl From<Timebase> for ffmpeg::Rational {
    fn from(time_base: Timebase) -> Self {
        ffmpeg::Rational::new(time_base.numerator(), time_base.denominator())
    }
}

fn media_kind(medium: ffmpeg::media::Type) -> MediaKind {
    match medium {
        ffmpeg::media::Type::Video => MediaKind::Video,
        ffmpeg::media::Type::Audio => MediaKind::Audio,
        _ => MediaKind::Other,
    }
}

fn codec(id: ffmpeg::codec::Id) -> Codec {
    match id {
        ffmpeg::codec::Id::AV1 => Codec::Av1,
        ffmpeg::codec::Id::H264 => Codec::H264,
        ffmpeg::codec::Id::HEVC => Codec::Hevc,
        ffmpeg::codec::Id::AAC => Codec::Aac,
        ffmpeg::codec::Id::AC3 => Codec::Ac3,
        ffmpeg::codec::Id::DTS => Codec::Dts,
        other => Codec::Other(format!("{:?}", other).to_lowercase()),
    }
}

impl CodedPacket for ffmpeg::Packet {
    fn stream_index(&self) -> usize {
        self.stream()
    }

    fn set_stream_index(&mut self, index: usize) {
        self.set_stream(index);
    }

    fn pts(&self) -> Option<i64> {
        ffmpeg::Packet::pts(self)
    }

    fn set_pts(&mut self, pts: Option<i64>) {
        ffmpeg::Packet::set_pts(self, pts);
    }

    fn dts(&self) -> Option<i64> {
        ffmpeg::Packet::dts(self)
    }

    fn set_dts(&mut self, dts: Option<i64>) {
        ffmpeg::Packet::set_dts(self, dts);
    }

    fn clear_position(&mut self) {
        self.set_position(-1);
    }

    fn rescale_ts(&mut self, from: Timebase, to: Timebase) {
        ffmpeg::Packet::rescale_ts(self, from, to);
    }
}

/// Source container opened through libavformat.
pub struct FfmpegDemuxer {
    path: PathBuf,
    context: ffmpeg::format::context::Input,
    streams: Vec<SourceStream>,
}

impl FfmpegDemuxer {
    /// Open `path` and describe its streams.
    pub fn open(path: &Path) -> Result<Self> {
        init_ffmpeg()?;

        let context = ffmpeg::format::input(path)
            .map_err(|e| Error::source_open(path, e.to_string()))?;

        let mut streams = Vec::with_capacity(context.nb_streams() as usize);
        for stream in context.streams() {
            let codec_ctx = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                .map_err(|e| Error::StreamInfoUnavailable {
                    path: path.to_path_buf(),
                    message: format!("stream #{}: {}", stream.index(), e),
                })?;

            streams.push(SourceStream::new(
                stream.index(),
                media_kind(codec_ctx.medium()),
                codec(codec_ctx.id()),
                stream.time_base().into(),
            ));
        }

        if streams.is_empty() {
            return Err(Error::StreamInfoUnavailable {
                path: path.to_path_buf(),
                message: "container declares no streams".to_string(),
            });
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Opened {:?} ({}): {} streams",
            path,
            context.format().name(),
            streams.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            context,
            streams,
        })
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Demuxer for FfmpegDemuxer {
    type Packet = ffmpeg::Packet;

    fn streams(&self) -> &[SourceStream] {
        &self.streams
    }

    fn alloc_packet(&self) -> ffmpeg::Packet {
        ffmpeg::Packet::empty()
    }

    fn read_packet(&mut self, slot: &mut ffmpeg::Packet) -> ReadStatus {
        match slot.read(&mut self.context) {
            Ok(()) => ReadStatus::Packet,
            Err(ffmpeg::Error::Eof) => ReadStatus::EndOfStream,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Read error on {:?}, treating as end of stream: {}", self.path, e);
                let _ = e; // Suppress unused warning when tracing is disabled
                ReadStatus::EndOfStream
            }
        }
    }
}

/// Output container written through libavformat.
pub struct FfmpegMuxer {
    context: ffmpeg::format::context::Output,
    options: ffmpeg::Dictionary<'static>,
    written: u64,
}

impl FfmpegMuxer {
    /// Allocate an output context for `path` (format guessed from the
    /// extension) and open the file for writing.
    pub fn create(path: &Path) -> Result<Self> {
        init_ffmpeg()?;

        let context = ffmpeg::format::output(path).map_err(|e| match e {
            ffmpeg::Error::Other { errno } if is_file_errno(errno) => Error::OutputOpenFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
            _ => Error::OutputContextFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        })?;

        Ok(Self {
            context,
            options: ffmpeg::Dictionary::new(),
            written: 0,
        })
    }
}

/// Errno values that come from opening the file rather than from picking a
/// muxer.
fn is_file_errno(errno: i32) -> bool {
    matches!(
        errno,
        libc::ENOENT | libc::EACCES | libc::EPERM | libc::EISDIR | libc::EROFS | libc::ENOSPC
    )
}

impl Muxer<FfmpegDemuxer> for FfmpegMuxer {
    fn add_stream(&mut self, demuxer: &FfmpegDemuxer, source: &SourceStream) -> Result<usize> {
        let input_stream = demuxer
            .context
            .stream(source.index)
            .ok_or_else(|| Error::parameter_copy(source.index, "source stream not found"))?;

        let mut output_stream = self
            .context
            .add_stream(ffmpeg::encoder::find(ffmpeg::codec::Id::None))
            .map_err(|e| {
                Error::parameter_copy(source.index, format!("failed allocating output stream: {}", e))
            })?;

        // Copy codec parameters verbatim and clear the codec tag so the
        // output container assigns its own.
        let ret = unsafe {
            let dst = (*output_stream.as_mut_ptr()).codecpar;
            let ret = ffmpeg::ffi::avcodec_parameters_copy(dst, (*input_stream.as_ptr()).codecpar);
            if ret >= 0 {
                (*dst).codec_tag = 0;
            }
            ret
        };
        if ret < 0 {
            return Err(Error::parameter_copy(
                source.index,
                ffmpeg::Error::from(ret).to_string(),
            ));
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            "Source stream {} mapped to output stream {}",
            source.index,
            output_stream.index()
        );

        Ok(output_stream.index())
    }

    fn set_option(&mut self, key: &str, value: &str) {
        self.options.set(key, value);
    }

    fn write_header(&mut self) -> Result<()> {
        let options = std::mem::replace(&mut self.options, ffmpeg::Dictionary::new());
        let unused = self
            .context
            .write_header_with(options)
            .map_err(|e| Error::HeaderWriteFailed(e.to_string()))?;

        #[cfg(feature = "tracing")]
        for (key, value) in unused.iter() {
            tracing::warn!("Muxer ignored option {}={}", key, value);
        }
        let _ = unused;

        Ok(())
    }

    fn time_base(&self, index: usize) -> Option<Timebase> {
        self.context.stream(index).map(|s| s.time_base().into())
    }

    fn write_interleaved(&mut self, packet: &mut ffmpeg::Packet) -> Result<()> {
        self.written += 1;
        packet
            .write_interleaved(&mut self.context)
            .map_err(|e| Error::MuxWriteFailed {
                packet: self.written,
                message: e.to_string(),
            })
    }

    fn write_trailer(&mut self) -> Result<()> {
        self.context
            .write_trailer()
            .map_err(|e| Error::TrailerWriteFailed(e.to_string()))
    }
}
