//! Remux pipeline: stream selection, lookahead, offset estimation and the
//! write loop.
//!
//! The stages run strictly in order on one thread:
//!
//! 1. [`select_streams`] creates the output streams
//! 2. [`LookaheadBuffer::fill`] reads the initial window
//! 3. [`normalize`] derives the [`OffsetState`] from that window
//! 4. the header is written and [`Writer`] drains the buffer

mod lookahead;
mod normalize;
mod select;
mod writer;

pub use lookahead::{Ledgers, LookaheadBuffer, StreamLedger, DEFAULT_LOOKAHEAD};
pub use normalize::{normalize, OffsetState, ANOMALY_FACTOR};
pub use select::{is_supported, select_streams, Selection, StreamMap, AUDIO_CODECS, VIDEO_CODECS};
pub use writer::{correct, Corrected, Verdict, Writer};

use crate::backend::{Demuxer, Muxer};
use crate::{Error, Result};

/// Options for a single remux operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemuxOptions {
    /// Number of packets read ahead before writing starts.
    pub lookahead: usize,
    /// Request `movflags=+faststart` so the index lands at the front.
    pub faststart: bool,
}

impl Default for RemuxOptions {
    fn default() -> Self {
        Self {
            lookahead: DEFAULT_LOOKAHEAD,
            faststart: true,
        }
    }
}

/// Outcome of a successful remux operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RemuxReport {
    /// Streams declared by the source.
    pub streams_in: usize,
    /// Streams carried into the output.
    pub streams_out: usize,
    pub packets_read: u64,
    pub packets_written: u64,
    /// Packets on kept streams that could not be repaired.
    pub packets_dropped: u64,
    /// Packets on excluded streams.
    pub packets_skipped: u64,
    /// Equal consecutive dts repaired by bumping the offsets.
    pub collisions: u64,
    /// pts behind dts repaired by shifting the pts offset.
    pub inversions: u64,
    /// dts behind the previous one lifted past it.
    pub regressions: u64,
    /// Offsets in effect after the last packet.
    pub offsets: OffsetState,
}

/// Remux everything `demuxer` yields into `muxer`.
///
/// The muxer must be freshly created: this adds its streams, writes the
/// header, every packet and the trailer.
pub fn remux<D, M>(demuxer: &mut D, muxer: &mut M, options: &RemuxOptions) -> Result<RemuxReport>
where
    D: Demuxer,
    M: Muxer<D>,
{
    if options.lookahead == 0 {
        return Err(Error::InvalidInput(
            "lookahead must hold at least one packet".to_string(),
        ));
    }

    let selection = select_streams(demuxer, muxer)?;
    let mut ledgers = Ledgers::new(selection.outputs.len());
    let mut buffer = LookaheadBuffer::new(options.lookahead, || demuxer.alloc_packet());

    if buffer.fill(demuxer, &selection.map, &mut ledgers) == 0 {
        return Err(Error::EmptySource);
    }

    let offsets = normalize(&buffer.window(&selection.map))?;

    if options.faststart {
        muxer.set_option("movflags", "+faststart");
    }
    muxer.write_header()?;

    // Muxers may pick their own timebases while writing the header
    let output_time_bases = selection
        .outputs
        .iter()
        .map(|o| muxer.time_base(o.index).unwrap_or(o.time_base))
        .collect();

    let mut writer = Writer::new(&selection, output_time_bases, ledgers, offsets);
    writer.run(demuxer, muxer, &mut buffer)?;
    muxer.write_trailer()?;

    let report = RemuxReport {
        streams_in: demuxer.streams().len(),
        streams_out: selection.outputs.len(),
        packets_read: buffer.reads(),
        ..writer.into_report()
    };

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Remuxed {} of {} packets ({} dropped, {} skipped); final offsets pts={} dts={}",
        report.packets_written,
        report.packets_read,
        report.packets_dropped,
        report.packets_skipped,
        report.offsets.pts_offset,
        report.offsets.dts_offset
    );

    Ok(report)
}
