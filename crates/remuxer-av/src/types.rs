//! Stream descriptions shared by the pipeline and its backends.

use std::fmt;

/// Rational number of seconds per tick for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timebase {
    num: i32,
    den: i32,
}

impl Timebase {
    /// Create a new timebase of `num / den` seconds per tick.
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    pub fn numerator(&self) -> i32 {
        self.num
    }

    pub fn denominator(&self) -> i32 {
        self.den
    }

    /// A timebase is usable when neither term is zero.
    pub fn is_valid(&self) -> bool {
        self.num != 0 && self.den != 0
    }

    /// Rescale `value` ticks from this timebase into `to`.
    ///
    /// Rounds to the nearest tick, halfway cases away from zero. Invalid
    /// timebases leave the value untouched.
    pub fn rescale(&self, value: i64, to: Timebase) -> i64 {
        if !self.is_valid() || !to.is_valid() || *self == to {
            return value;
        }

        let mut n = value as i128 * self.num as i128 * to.den as i128;
        let mut d = self.den as i128 * to.num as i128;
        if d < 0 {
            n = -n;
            d = -d;
        }

        let half = d / 2;
        let rounded = if n >= 0 { (n + half) / d } else { (n - half) / d };
        rounded.clamp(i64::MIN as i128 + 1, i64::MAX as i128) as i64
    }
}

impl From<(i32, i32)> for Timebase {
    fn from((num, den): (i32, i32)) -> Self {
        Self::new(num, den)
    }
}

impl fmt::Display for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Broad media category of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MediaKind {
    Audio,
    Video,
    Other,
}

/// Codec of a coded stream, as far as stream selection cares.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Codec {
    Av1,
    H264,
    Hevc,
    Aac,
    Ac3,
    Dts,
    /// Anything else, carrying the backend's name for logging.
    Other(String),
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Av1 => f.write_str("av1"),
            Codec::H264 => f.write_str("h264"),
            Codec::Hevc => f.write_str("hevc"),
            Codec::Aac => f.write_str("aac"),
            Codec::Ac3 => f.write_str("ac3"),
            Codec::Dts => f.write_str("dts"),
            Codec::Other(name) => f.write_str(name),
        }
    }
}

/// A stream declared by the source container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStream {
    /// 0-based index in the source, stable for the whole operation.
    pub index: usize,
    pub kind: MediaKind,
    pub codec: Codec,
    pub time_base: Timebase,
}

impl SourceStream {
    pub fn new(index: usize, kind: MediaKind, codec: Codec, time_base: Timebase) -> Self {
        Self {
            index,
            kind,
            codec,
            time_base,
        }
    }
}

/// A stream created in the output container for one selected source stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputStream {
    pub index: usize,
    pub source_index: usize,
    /// Source timebase until the output header is written, then whatever
    /// the muxer assigned.
    pub time_base: Timebase,
}
