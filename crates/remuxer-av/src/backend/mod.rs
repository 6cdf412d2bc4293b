//! Demux/mux backend capabilities consumed by the pipeline.
//!
//! The pipeline never parses containers itself. It drives a [`Demuxer`] and a
//! [`Muxer`] through this surface:
//!
//! - **Native FFmpeg** (default): `ffmpeg-the-third` bindings via the
//!   `native-ffmpeg` feature
//! - **Memory**: an in-process backend that replays scripted packets and
//!   records what was written

pub mod memory;

#[cfg(feature = "native-ffmpeg")]
mod native_ffmpeg;

#[cfg(feature = "native-ffmpeg")]
pub use native_ffmpeg::{FfmpegDemuxer, FfmpegMuxer};

use crate::{Result, SourceStream, Timebase};

/// Outcome of reading one packet from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The slot now holds a fresh packet.
    Packet,
    /// The source has no more packets. Read failures are reported this way too.
    EndOfStream,
}

/// Timestamp and routing accessors of a coded packet.
///
/// Timestamps are ticks in the timebase of the stream the packet currently
/// belongs to; `None` is the backend's "unset" value.
pub trait CodedPacket {
    fn stream_index(&self) -> usize;
    fn set_stream_index(&mut self, index: usize);

    fn pts(&self) -> Option<i64>;
    fn set_pts(&mut self, pts: Option<i64>);

    fn dts(&self) -> Option<i64>;
    fn set_dts(&mut self, dts: Option<i64>);

    /// Forget the byte offset the packet had in the source file.
    fn clear_position(&mut self);

    /// Convert pts and dts from one timebase to another.
    fn rescale_ts(&mut self, from: Timebase, to: Timebase);
}

/// An opened source container.
pub trait Demuxer {
    type Packet: CodedPacket;

    /// Streams declared by the source, in source order.
    fn streams(&self) -> &[SourceStream];

    /// Allocate a blank packet slot.
    fn alloc_packet(&self) -> Self::Packet;

    /// Read the next packet into `slot`, replacing whatever it held.
    fn read_packet(&mut self, slot: &mut Self::Packet) -> ReadStatus;
}

/// An allocated output container fed from a demuxer of type `D`.
pub trait Muxer<D: Demuxer> {
    /// Create an output stream carrying a verbatim copy of `source`'s codec
    /// parameters with the container codec tag cleared. Returns its index.
    fn add_stream(&mut self, demuxer: &D, source: &SourceStream) -> Result<usize>;

    /// Set a container option applied when the header is written.
    fn set_option(&mut self, key: &str, value: &str);

    fn write_header(&mut self) -> Result<()>;

    /// Timebase of an output stream. Only final after the header is written.
    fn time_base(&self, index: usize) -> Option<Timebase>;

    /// Hand a packet over for interleaved writing. The backend may leave the
    /// packet blank afterwards.
    fn write_interleaved(&mut self, packet: &mut D::Packet) -> Result<()>;

    fn write_trailer(&mut self) -> Result<()>;
}
