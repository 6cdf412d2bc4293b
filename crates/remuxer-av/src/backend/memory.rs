//! In-memory backend.
//!
//! [`MemoryDemuxer`] replays a scripted packet sequence and [`MemoryMuxer`]
//! records every packet handed to it, in write order. Failures can be
//! injected at stream creation, header, packet write and trailer time.
//!
//! # Example
//!
//! ```
//! use remuxer_av::backend::memory::{MemoryDemuxer, MemoryMuxer, MemoryPacket};
//! use remuxer_av::{remux, Codec, MediaKind, RemuxOptions, SourceStream, Timebase};
//!
//! let mut demuxer = MemoryDemuxer::new(
//!     vec![SourceStream::new(0, MediaKind::Video, Codec::H264, Timebase::new(1, 1000))],
//!     vec![MemoryPacket::new(0, 0, 0), MemoryPacket::new(0, 40, 40)],
//! );
//! let mut muxer = MemoryMuxer::new();
//!
//! let report = remux(&mut demuxer, &mut muxer, &RemuxOptions::default())?;
//! assert_eq!(report.packets_written, 2);
//! # Ok::<(), remuxer_av::Error>(())
//! ```

use super::{CodedPacket, Demuxer, Muxer, ReadStatus};
use crate::{Error, Result, SourceStream, Timebase};
use std::collections::VecDeque;

/// A packet held entirely in memory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryPacket {
    pub stream: usize,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    /// Byte offset in the source, if known.
    pub position: Option<u64>,
    pub payload: Vec<u8>,
}

impl MemoryPacket {
    /// A packet on `stream` with both timestamps set.
    pub fn new(stream: usize, pts: i64, dts: i64) -> Self {
        Self {
            stream,
            pts: Some(pts),
            dts: Some(dts),
            position: None,
            payload: Vec::new(),
        }
    }

    /// A packet on `stream` whose timestamps are unset.
    pub fn untimed(stream: usize) -> Self {
        Self {
            stream,
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: u64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }
}

impl CodedPacket for MemoryPacket {
    fn stream_index(&self) -> usize {
        self.stream
    }

    fn set_stream_index(&mut self, index: usize) {
        self.stream = index;
    }

    fn pts(&self) -> Option<i64> {
        self.pts
    }

    fn set_pts(&mut self, pts: Option<i64>) {
        self.pts = pts;
    }

    fn dts(&self) -> Option<i64> {
        self.dts
    }

    fn set_dts(&mut self, dts: Option<i64>) {
        self.dts = dts;
    }

    fn clear_position(&mut self) {
        self.position = None;
    }

    fn rescale_ts(&mut self, from: Timebase, to: Timebase) {
        self.pts = self.pts.map(|v| from.rescale(v, to));
        self.dts = self.dts.map(|v| from.rescale(v, to));
    }
}

/// Source that replays a fixed packet list.
#[derive(Debug, Clone)]
pub struct MemoryDemuxer {
    streams: Vec<SourceStream>,
    packets: VecDeque<MemoryPacket>,
    reads: usize,
}

impl MemoryDemuxer {
    pub fn new(streams: Vec<SourceStream>, packets: impl IntoIterator<Item = MemoryPacket>) -> Self {
        Self {
            streams,
            packets: packets.into_iter().collect(),
            reads: 0,
        }
    }

    /// Number of successful reads so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Packets not read yet.
    pub fn remaining(&self) -> usize {
        self.packets.len()
    }
}

impl Demuxer for MemoryDemuxer {
    type Packet = MemoryPacket;

    fn streams(&self) -> &[SourceStream] {
        &self.streams
    }

    fn alloc_packet(&self) -> MemoryPacket {
        MemoryPacket::default()
    }

    fn read_packet(&mut self, slot: &mut MemoryPacket) -> ReadStatus {
        match self.packets.pop_front() {
            Some(packet) => {
                *slot = packet;
                self.reads += 1;
                ReadStatus::Packet
            }
            None => ReadStatus::EndOfStream,
        }
    }
}

/// Output stream recorded by [`MemoryMuxer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryOutputStream {
    pub source_index: usize,
    pub time_base: Timebase,
    /// Container codec tag; always cleared on creation.
    pub codec_tag: u32,
}

/// Sink that records everything written to it.
#[derive(Debug, Clone, Default)]
pub struct MemoryMuxer {
    streams: Vec<MemoryOutputStream>,
    options: Vec<(String, String)>,
    written: Vec<MemoryPacket>,
    header_written: bool,
    trailer_written: bool,
    output_time_base: Option<Timebase>,
    fail_stream: Option<usize>,
    fail_header: bool,
    fail_write_at: Option<usize>,
    fail_trailer: bool,
}

impl MemoryMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign this timebase to every output stream when the header is
    /// written, the way real muxers pick their own.
    pub fn with_output_time_base(mut self, time_base: Timebase) -> Self {
        self.output_time_base = Some(time_base);
        self
    }

    /// Refuse to create an output stream for this source index.
    pub fn fail_stream(mut self, source_index: usize) -> Self {
        self.fail_stream = Some(source_index);
        self
    }

    pub fn fail_header(mut self) -> Self {
        self.fail_header = true;
        self
    }

    /// Reject the packet write with this 0-based ordinal.
    pub fn fail_write_at(mut self, ordinal: usize) -> Self {
        self.fail_write_at = Some(ordinal);
        self
    }

    pub fn fail_trailer(mut self) -> Self {
        self.fail_trailer = true;
        self
    }

    pub fn streams(&self) -> &[MemoryOutputStream] {
        &self.streams
    }

    pub fn options(&self) -> &[(String, String)] {
        &self.options
    }

    /// Packets in the order they were written.
    pub fn written(&self) -> &[MemoryPacket] {
        &self.written
    }

    /// Packets written to one output stream, in write order.
    pub fn written_to(&self, stream: usize) -> Vec<&MemoryPacket> {
        self.written.iter().filter(|p| p.stream == stream).collect()
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    pub fn trailer_written(&self) -> bool {
        self.trailer_written
    }
}

impl Muxer<MemoryDemuxer> for MemoryMuxer {
    fn add_stream(&mut self, _demuxer: &MemoryDemuxer, source: &SourceStream) -> Result<usize> {
        if self.fail_stream == Some(source.index) {
            return Err(Error::parameter_copy(source.index, "injected failure"));
        }

        self.streams.push(MemoryOutputStream {
            source_index: source.index,
            time_base: source.time_base,
            codec_tag: 0,
        });
        Ok(self.streams.len() - 1)
    }

    fn set_option(&mut self, key: &str, value: &str) {
        self.options.push((key.to_string(), value.to_string()));
    }

    fn write_header(&mut self) -> Result<()> {
        if self.fail_header {
            return Err(Error::HeaderWriteFailed("injected failure".to_string()));
        }
        if let Some(time_base) = self.output_time_base {
            for stream in &mut self.streams {
                stream.time_base = time_base;
            }
        }
        self.header_written = true;
        Ok(())
    }

    fn time_base(&self, index: usize) -> Option<Timebase> {
        self.streams.get(index).map(|s| s.time_base)
    }

    fn write_interleaved(&mut self, packet: &mut MemoryPacket) -> Result<()> {
        if self.fail_write_at == Some(self.written.len()) {
            return Err(Error::MuxWriteFailed {
                packet: self.written.len() as u64 + 1,
                message: "injected failure".to_string(),
            });
        }
        self.written.push(std::mem::take(packet));
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<()> {
        if self.fail_trailer {
            return Err(Error::TrailerWriteFailed("injected failure".to_string()));
        }
        self.trailer_written = true;
        Ok(())
    }
}
