//! Lookahead packet buffer and per-stream timestamp ledgers.
//!
//! The buffer is a fixed ring of packet slots filled ahead of the writer so
//! that offsets can be estimated over a real sample before the first packet
//! is committed. Slots are allocated once and reused for the whole
//! operation: consuming a slot immediately reads its replacement.

use super::select::StreamMap;
use crate::backend::{CodedPacket, Demuxer, ReadStatus};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Default number of packets read ahead.
pub const DEFAULT_LOOKAHEAD: usize = 100;

/// Pending decode timestamps of one output stream.
///
/// Every presentation timestamp read for the stream is queued here; the
/// writer pops them in ascending order to obtain decode order.
#[derive(Debug, Clone, Default)]
pub struct StreamLedger {
    pending: BinaryHeap<Reverse<i64>>,
    last_written: Option<i64>,
}

impl StreamLedger {
    pub fn push(&mut self, pts: i64) {
        self.pending.push(Reverse(pts));
    }

    /// Smallest pending timestamp.
    pub fn pop_front(&mut self) -> Option<i64> {
        self.pending.pop().map(|Reverse(v)| v)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Decode timestamp of the last packet written on this stream.
    pub fn last_written(&self) -> Option<i64> {
        self.last_written
    }

    pub fn record_written(&mut self, dts: i64) {
        self.last_written = Some(dts);
    }
}

/// Ledgers for all output streams, indexed by output stream index.
#[derive(Debug, Clone, Default)]
pub struct Ledgers {
    streams: Vec<StreamLedger>,
}

impl Ledgers {
    pub fn new(outputs: usize) -> Self {
        Self {
            streams: vec![StreamLedger::default(); outputs],
        }
    }

    /// Queue the packet's pts on its stream's ledger.
    ///
    /// Excluded streams and packets without a pts are ignored.
    pub fn record<P: CodedPacket>(&mut self, map: &StreamMap, packet: &P) {
        if let (Some(out), Some(pts)) = (map.output_for(packet.stream_index()), packet.pts()) {
            if let Some(ledger) = self.streams.get_mut(out) {
                ledger.push(pts);
            }
        }
    }

    pub fn get_mut(&mut self, output_index: usize) -> Option<&mut StreamLedger> {
        self.streams.get_mut(output_index)
    }

    pub fn get(&self, output_index: usize) -> Option<&StreamLedger> {
        self.streams.get(output_index)
    }
}

/// Fixed-capacity ring of packets read ahead of the writer.
pub struct LookaheadBuffer<P> {
    slots: Vec<P>,
    /// Read cursor.
    pos: usize,
    /// Number of slots holding packets from the initial fill.
    filled: usize,
    drained: bool,
    /// First slot left empty once the source ran out.
    last: usize,
    reads: u64,
}

impl<P: CodedPacket> LookaheadBuffer<P> {
    /// Allocate `capacity` slots up front.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, alloc: impl FnMut() -> P) -> Self {
        assert!(capacity > 0, "lookahead capacity must be at least 1");
        let slots = std::iter::repeat_with(alloc).take(capacity).collect();
        Self {
            slots,
            pos: 0,
            filled: 0,
            drained: false,
            last: 0,
            reads: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Read until every slot holds a packet or the source is exhausted.
    ///
    /// Returns the number of packets read.
    pub fn fill<D>(&mut self, demuxer: &mut D, map: &StreamMap, ledgers: &mut Ledgers) -> usize
    where
        D: Demuxer<Packet = P>,
    {
        for i in 0..self.slots.len() {
            match demuxer.read_packet(&mut self.slots[i]) {
                ReadStatus::Packet => {
                    self.reads += 1;
                    ledgers.record(map, &self.slots[i]);
                }
                ReadStatus::EndOfStream => {
                    self.drained = true;
                    self.last = i;
                    self.filled = i;
                    return i;
                }
            }
        }
        self.filled = self.slots.len();
        self.filled
    }

    /// Presentation timestamps of the initial fill, per output stream, in
    /// arrival order. Only meaningful before the first [`refill`](Self::refill).
    pub fn window(&self, map: &StreamMap) -> Vec<Vec<Option<i64>>> {
        let mut window = vec![Vec::new(); map.included()];
        for packet in &self.slots[..self.filled] {
            if let Some(out) = map.output_for(packet.stream_index()) {
                window[out].push(packet.pts());
            }
        }
        window
    }

    /// The packet at the read cursor.
    pub fn current_mut(&mut self) -> &mut P {
        &mut self.slots[self.pos]
    }

    /// Read a replacement into the slot at the cursor, then advance it.
    pub fn refill<D>(&mut self, demuxer: &mut D, map: &StreamMap, ledgers: &mut Ledgers)
    where
        D: Demuxer<Packet = P>,
    {
        if !self.drained {
            match demuxer.read_packet(&mut self.slots[self.pos]) {
                ReadStatus::Packet => {
                    self.reads += 1;
                    ledgers.record(map, &self.slots[self.pos]);
                }
                ReadStatus::EndOfStream => {
                    self.drained = true;
                    self.last = self.pos;
                }
            }
        }
        self.pos = (self.pos + 1) % self.slots.len();
    }

    /// True once the source is exhausted and every buffered packet has been
    /// consumed.
    pub fn is_drained(&self) -> bool {
        self.drained && self.pos == self.last
    }

    /// Total packets read from the source so far.
    pub fn reads(&self) -> u64 {
        self.reads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryDemuxer, MemoryPacket};
    use crate::{Codec, MediaKind, SourceStream, Timebase};

    fn demuxer(packets: Vec<MemoryPacket>) -> MemoryDemuxer {
        MemoryDemuxer::new(
            vec![
                SourceStream::new(0, MediaKind::Video, Codec::H264, Timebase::new(1, 1000)),
                SourceStream::new(1, MediaKind::Other, Codec::Other("bin_data".into()), Timebase::new(1, 1000)),
            ],
            packets,
        )
    }

    /// Consume the whole buffer, returning the pts of each packet in order.
    fn drain(
        buffer: &mut LookaheadBuffer<MemoryPacket>,
        demuxer: &mut MemoryDemuxer,
        map: &StreamMap,
        ledgers: &mut Ledgers,
    ) -> Vec<Option<i64>> {
        let mut seen = Vec::new();
        while !buffer.is_drained() {
            seen.push(buffer.current_mut().pts);
            buffer.refill(demuxer, map, ledgers);
        }
        seen
    }

    #[test]
    fn test_ledger_pops_ascending() {
        let mut ledger = StreamLedger::default();
        for v in [80, 0, 40, 0] {
            ledger.push(v);
        }
        assert_eq!(ledger.pop_front(), Some(0));
        assert_eq!(ledger.pop_front(), Some(0));
        assert_eq!(ledger.pop_front(), Some(40));
        assert_eq!(ledger.pop_front(), Some(80));
        assert_eq!(ledger.pop_front(), None);
    }

    #[test]
    fn test_fill_short_source() {
        let mut demux = demuxer((0..3).map(|i| MemoryPacket::new(0, i * 40, i * 40)).collect());
        let map = StreamMap::plan(demux.streams());
        let mut ledgers = Ledgers::new(map.included());
        let mut buffer = LookaheadBuffer::new(10, MemoryPacket::default);

        assert_eq!(buffer.fill(&mut demux, &map, &mut ledgers), 3);
        assert_eq!(buffer.window(&map), vec![vec![Some(0), Some(40), Some(80)]]);
        assert_eq!(ledgers.get(0).unwrap().pending(), 3);

        let seen = drain(&mut buffer, &mut demux, &map, &mut ledgers);
        assert_eq!(seen, vec![Some(0), Some(40), Some(80)]);
    }

    #[test]
    fn test_ring_wraps_and_preserves_order() {
        let packets: Vec<_> = (0..25).map(|i| MemoryPacket::new(0, i, i)).collect();
        let mut demux = demuxer(packets);
        let map = StreamMap::plan(demux.streams());
        let mut ledgers = Ledgers::new(map.included());
        let mut buffer = LookaheadBuffer::new(4, MemoryPacket::default);

        assert_eq!(buffer.fill(&mut demux, &map, &mut ledgers), 4);
        assert_eq!(demux.remaining(), 21);

        let seen = drain(&mut buffer, &mut demux, &map, &mut ledgers);
        assert_eq!(seen, (0..25).map(Some).collect::<Vec<_>>());
        assert_eq!(buffer.reads(), 25);
    }

    #[test]
    fn test_exact_capacity_source() {
        let mut demux = demuxer((0..4).map(|i| MemoryPacket::new(0, i, i)).collect());
        let map = StreamMap::plan(demux.streams());
        let mut ledgers = Ledgers::new(map.included());
        let mut buffer = LookaheadBuffer::new(4, MemoryPacket::default);

        assert_eq!(buffer.fill(&mut demux, &map, &mut ledgers), 4);
        assert!(!buffer.is_drained());
        let seen = drain(&mut buffer, &mut demux, &map, &mut ledgers);
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_capacity_one() {
        let mut demux = demuxer((0..3).map(|i| MemoryPacket::new(0, i, i)).collect());
        let map = StreamMap::plan(demux.streams());
        let mut ledgers = Ledgers::new(map.included());
        let mut buffer = LookaheadBuffer::new(1, MemoryPacket::default);

        buffer.fill(&mut demux, &map, &mut ledgers);
        let seen = drain(&mut buffer, &mut demux, &map, &mut ledgers);
        assert_eq!(seen, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn test_empty_source_is_drained_immediately() {
        let mut demux = demuxer(vec![]);
        let map = StreamMap::plan(demux.streams());
        let mut ledgers = Ledgers::new(map.included());
        let mut buffer = LookaheadBuffer::new(8, MemoryPacket::default);

        assert_eq!(buffer.fill(&mut demux, &map, &mut ledgers), 0);
        assert!(buffer.is_drained());
    }

    #[test]
    fn test_excluded_streams_are_buffered_but_not_recorded() {
        let mut demux = demuxer(vec![
            MemoryPacket::new(0, 0, 0),
            MemoryPacket::new(1, 7, 7),
            MemoryPacket::new(0, 40, 40),
        ]);
        let map = StreamMap::plan(demux.streams());
        let mut ledgers = Ledgers::new(map.included());
        let mut buffer = LookaheadBuffer::new(8, MemoryPacket::default);

        assert_eq!(buffer.fill(&mut demux, &map, &mut ledgers), 3);
        assert_eq!(buffer.window(&map), vec![vec![Some(0), Some(40)]]);
        assert_eq!(ledgers.get(0).unwrap().pending(), 2);

        let seen = drain(&mut buffer, &mut demux, &map, &mut ledgers);
        assert_eq!(seen, vec![Some(0), Some(7), Some(40)]);
    }
}
