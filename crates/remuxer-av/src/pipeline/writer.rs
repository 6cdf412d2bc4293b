//! Timestamp repair and the packet write loop.

use super::lookahead::{Ledgers, LookaheadBuffer, StreamLedger};
use super::normalize::OffsetState;
use super::select::Selection;
use super::RemuxReport;
use crate::backend::{CodedPacket, Demuxer, Muxer};
use crate::{Result, Timebase};

/// Timestamps of one packet after repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corrected {
    pub pts: i64,
    pub dts: i64,
    /// The dts equalled the previous one and every value was bumped by one.
    pub collided: bool,
    /// The dts fell behind the previous one and was lifted past it.
    pub regressed: bool,
    /// Amount added to pts to bring it back to the dts, 0 if none.
    pub shifted: i64,
}

/// What the writer should do with a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Write(Corrected),
    /// The packet cannot be repaired within the anomaly threshold.
    Drop { pts: i64, dts: i64 },
}

/// Apply offsets and the repair rules to one packet with presentation
/// timestamp `pts` on the stream owning `ledger`.
///
/// Pops the stream's next decode timestamp. Collision and inversion repairs
/// move `offsets` for every later packet.
pub fn correct(pts: i64, ledger: &mut StreamLedger, offsets: &mut OffsetState) -> Verdict {
    let mut pts = pts.saturating_add(offsets.pts_offset);
    let Some(front) = ledger.pop_front() else {
        // Every timed packet queued its pts, so this means a foreign packet
        return Verdict::Drop { pts, dts: pts };
    };
    let mut dts = front.saturating_add(offsets.dts_offset);

    let mut out = Corrected {
        pts,
        dts,
        collided: false,
        regressed: false,
        shifted: 0,
    };

    if let Some(last) = ledger.last_written() {
        if dts == last {
            dts = dts.saturating_add(1);
            pts = pts.saturating_add(1);
            offsets.pts_offset = offsets.pts_offset.saturating_add(1);
            offsets.dts_offset = offsets.dts_offset.saturating_add(1);
            out.collided = true;
        } else if dts < last {
            dts = last.saturating_add(1);
            out.regressed = true;
        }
    }

    if pts < dts {
        let diff = dts.saturating_sub(pts);
        if diff > offsets.anomaly_threshold() {
            return Verdict::Drop { pts, dts };
        }
        offsets.pts_offset = offsets.pts_offset.saturating_add(diff);
        pts = pts.saturating_add(diff);
        out.shifted = diff;
    }

    out.pts = pts;
    out.dts = dts;
    Verdict::Write(out)
}

/// Drives packets from the lookahead buffer into the muxer.
pub struct Writer<'a> {
    selection: &'a Selection,
    /// Final timebase of every output stream, read after the header.
    output_time_bases: Vec<Timebase>,
    ledgers: Ledgers,
    offsets: OffsetState,
    report: RemuxReport,
}

impl<'a> Writer<'a> {
    pub fn new(
        selection: &'a Selection,
        output_time_bases: Vec<Timebase>,
        ledgers: Ledgers,
        offsets: OffsetState,
    ) -> Self {
        Self {
            selection,
            output_time_bases,
            ledgers,
            offsets,
            report: RemuxReport::default(),
        }
    }

    /// Current offsets, including repairs made so far.
    pub fn offsets(&self) -> OffsetState {
        self.offsets
    }

    /// Write every remaining packet of `buffer`.
    ///
    /// A rejected packet is fatal; the trailer is still attempted first so the
    /// body already written is finalized.
    pub fn run<D, M>(
        &mut self,
        demuxer: &mut D,
        muxer: &mut M,
        buffer: &mut LookaheadBuffer<D::Packet>,
    ) -> Result<()>
    where
        D: Demuxer,
        M: Muxer<D>,
    {
        let selection = self.selection;

        while !buffer.is_drained() {
            if let Err(e) = self.write_one::<D, M>(muxer, buffer.current_mut()) {
                #[cfg(feature = "tracing")]
                tracing::error!("{}", e);
                if let Err(trailer) = muxer.write_trailer() {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Trailer after failed write: {}", trailer);
                    let _ = trailer;
                }
                return Err(e);
            }
            buffer.refill(demuxer, &selection.map, &mut self.ledgers);
        }

        Ok(())
    }

    fn write_one<D, M>(&mut self, muxer: &mut M, packet: &mut D::Packet) -> Result<()>
    where
        D: Demuxer,
        M: Muxer<D>,
    {
        let source_index = packet.stream_index();
        let Some(out) = self.selection.map.output_for(source_index) else {
            self.report.packets_skipped += 1;
            return Ok(());
        };

        let Some(raw_pts) = packet.pts() else {
            #[cfg(feature = "tracing")]
            tracing::warn!("Dropping packet without pts on stream #{}", source_index);
            self.report.packets_dropped += 1;
            return Ok(());
        };

        let Some(ledger) = self.ledgers.get_mut(out) else {
            self.report.packets_dropped += 1;
            return Ok(());
        };

        let fixed = match correct(raw_pts, ledger, &mut self.offsets) {
            Verdict::Write(fixed) => fixed,
            Verdict::Drop { pts, dts } => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Dropping packet on stream #{}: pts {} is {} ticks behind dts {}",
                    source_index,
                    pts,
                    dts.saturating_sub(pts),
                    dts
                );
                let _ = (pts, dts);
                self.report.packets_dropped += 1;
                return Ok(());
            }
        };

        if fixed.collided {
            self.report.collisions += 1;
            #[cfg(feature = "tracing")]
            tracing::debug!(
                "Equal dts on stream #{}, shifting offsets to pts={} dts={}",
                source_index,
                self.offsets.pts_offset,
                self.offsets.dts_offset
            );
        }
        if fixed.regressed {
            self.report.regressions += 1;
            #[cfg(feature = "tracing")]
            tracing::debug!("Backwards dts on stream #{}, lifted to {}", source_index, fixed.dts);
        }
        if fixed.shifted > 0 {
            self.report.inversions += 1;
            #[cfg(feature = "tracing")]
            tracing::debug!(
                "pts behind dts on stream #{} by {}, pts offset now {}",
                source_index,
                fixed.shifted,
                self.offsets.pts_offset
            );
        }

        let source_tb = self.selection.outputs[out].time_base;
        let output_tb = self.output_time_bases.get(out).copied().unwrap_or(source_tb);

        packet.set_pts(Some(fixed.pts));
        packet.set_dts(Some(fixed.dts));
        packet.set_stream_index(out);
        packet.rescale_ts(source_tb, output_tb);
        packet.clear_position();

        muxer.write_interleaved(packet)?;

        ledger.record_written(fixed.dts);
        self.report.packets_written += 1;
        Ok(())
    }

    /// Consume the writer, returning its counters and final offsets.
    pub fn into_report(self) -> RemuxReport {
        RemuxReport {
            offsets: self.offsets,
            ..self.report
        }
    }
}
