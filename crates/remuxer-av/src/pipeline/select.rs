//! Stream selection.
//!
//! A source stream is carried into the output iff it is audio or video and
//! its codec is on the allow-list. Kept streams are renumbered densely from 0
//! in source order.

use crate::backend::{Demuxer, Muxer};
use crate::{Codec, MediaKind, OutputStream, Result, SourceStream};

/// Video codecs accepted for remuxing.
pub const VIDEO_CODECS: &[Codec] = &[Codec::Av1, Codec::H264, Codec::Hevc];

/// Audio codecs accepted for remuxing.
pub const AUDIO_CODECS: &[Codec] = &[Codec::Aac, Codec::Ac3, Codec::Dts];

/// Check whether a stream of this kind and codec may be remuxed.
pub fn is_supported(kind: MediaKind, codec: &Codec) -> bool {
    match kind {
        MediaKind::Video => VIDEO_CODECS.contains(codec),
        MediaKind::Audio => AUDIO_CODECS.contains(codec),
        MediaKind::Other => false,
    }
}

/// Mapping from source stream index to output stream index.
///
/// `None` marks an excluded stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamMap {
    entries: Vec<Option<usize>>,
}

impl StreamMap {
    /// Decide inclusion for every source stream without touching a muxer.
    pub fn plan(streams: &[SourceStream]) -> Self {
        let mut next = 0usize;
        let entries = streams
            .iter()
            .map(|stream| {
                if is_supported(stream.kind, &stream.codec) {
                    next += 1;
                    Some(next - 1)
                } else {
                    None
                }
            })
            .collect();
        Self { entries }
    }

    /// Output index for a source stream, or `None` if it is excluded or the
    /// index is out of range.
    pub fn output_for(&self, source_index: usize) -> Option<usize> {
        self.entries.get(source_index).copied().flatten()
    }

    /// Number of source streams covered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of streams carried into the output.
    pub fn included(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// `(source_index, output_index)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<usize>)> + '_ {
        self.entries.iter().copied().enumerate()
    }
}

/// Result of stream selection: the map and the created output streams.
#[derive(Debug, Clone)]
pub struct Selection {
    pub map: StreamMap,
    /// Indexed by output stream index.
    pub outputs: Vec<OutputStream>,
}

/// Select streams from `demuxer` and create the kept ones on `muxer`.
///
/// Fails with `ParameterCopyFailed` if any kept stream cannot be created.
pub fn select_streams<D, M>(demuxer: &D, muxer: &mut M) -> Result<Selection>
where
    D: Demuxer,
    M: Muxer<D>,
{
    let streams = demuxer.streams();
    let map = StreamMap::plan(streams);
    let mut outputs = Vec::with_capacity(map.included());

    for stream in streams {
        let Some(planned) = map.output_for(stream.index) else {
            #[cfg(feature = "tracing")]
            tracing::info!(
                "{:?} stream #{} ({}) not supported, skipping",
                stream.kind,
                stream.index,
                stream.codec
            );
            continue;
        };

        let created = muxer.add_stream(demuxer, stream)?;
        if created != planned {
            return Err(crate::Error::parameter_copy(
                stream.index,
                format!("muxer assigned index {} instead of {}", created, planned),
            ));
        }

        outputs.push(OutputStream {
            index: planned,
            source_index: stream.index,
            time_base: stream.time_base,
        });
    }

    Ok(Selection { map, outputs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryDemuxer, MemoryMuxer};
    use crate::{Error, Timebase};

    fn stream(index: usize, kind: MediaKind, codec: Codec) -> SourceStream {
        SourceStream::new(index, kind, codec, Timebase::new(1, 1000))
    }

    #[test]
    fn test_allow_list() {
        assert!(is_supported(MediaKind::Video, &Codec::H264));
        assert!(is_supported(MediaKind::Video, &Codec::Av1));
        assert!(is_supported(MediaKind::Audio, &Codec::Dts));
        assert!(!is_supported(MediaKind::Video, &Codec::Aac));
        assert!(!is_supported(MediaKind::Audio, &Codec::Other("opus".into())));
        assert!(!is_supported(MediaKind::Other, &Codec::H264));
    }

    #[test]
    fn test_plan_renumbers_densely() {
        let streams = vec![
            stream(0, MediaKind::Other, Codec::Other("bin_data".into())),
            stream(1, MediaKind::Video, Codec::Hevc),
            stream(2, MediaKind::Audio, Codec::Other("mp3".into())),
            stream(3, MediaKind::Audio, Codec::Aac),
        ];
        let map = StreamMap::plan(&streams);

        assert_eq!(map.len(), 4);
        assert_eq!(map.included(), 2);
        assert_eq!(map.output_for(0), None);
        assert_eq!(map.output_for(1), Some(0));
        assert_eq!(map.output_for(2), None);
        assert_eq!(map.output_for(3), Some(1));
        assert_eq!(map.output_for(99), None);
    }

    #[test]
    fn test_select_creates_only_kept_streams() {
        let demuxer = MemoryDemuxer::new(
            vec![
                stream(0, MediaKind::Video, Codec::Other("mpeg2video".into())),
                stream(1, MediaKind::Video, Codec::H264),
                stream(2, MediaKind::Audio, Codec::Ac3),
            ],
            vec![],
        );
        let mut muxer = MemoryMuxer::new();

        let selection = select_streams(&demuxer, &mut muxer).unwrap();

        assert_eq!(selection.outputs.len(), 2);
        assert_eq!(selection.outputs[0].source_index, 1);
        assert_eq!(selection.outputs[1].source_index, 2);
        assert_eq!(muxer.streams().len(), 2);
        assert!(muxer.streams().iter().all(|s| s.codec_tag == 0));
        assert!(selection.map.iter().all(|(_, out)| out != Some(2)));
    }

    #[test]
    fn test_select_parameter_copy_failure_is_fatal() {
        let demuxer = MemoryDemuxer::new(
            vec![
                stream(0, MediaKind::Video, Codec::H264),
                stream(1, MediaKind::Audio, Codec::Aac),
            ],
            vec![],
        );
        let mut muxer = MemoryMuxer::new().fail_stream(1);

        let result = select_streams(&demuxer, &mut muxer);
        assert!(matches!(
            result,
            Err(Error::ParameterCopyFailed { stream: 1, .. })
        ));
    }
}
