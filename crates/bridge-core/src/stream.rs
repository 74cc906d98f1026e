//! Byte-stream endpoints: the transport primitives the bridge consumes.

use std::collections::VecDeque;

/// One byte on a stream, with the frame-end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Beat {
    /// Data byte.
    pub data: u8,
    /// Set on the final byte of a frame.
    pub last: bool,
}

impl Beat {
    /// Byte in the middle of a frame.
    #[must_use]
    pub const fn byte(data: u8) -> Self {
        Self { data, last: false }
    }

    /// Final byte of a frame.
    #[must_use]
    pub const fn last(data: u8) -> Self {
        Self { data, last: true }
    }
}

/// Producer side of the input stream.
pub trait StreamSource {
    /// Takes the next offered byte, or `None` when nothing is offered yet.
    fn next_beat(&mut self) -> Option<Beat>;
}

/// Consumer side of the output stream.
pub trait StreamSink {
    /// Offers one byte. Returns `false` to apply back-pressure, in which case
    /// the same byte is offered again later.
    fn offer(&mut self, beat: Beat) -> bool;
}

impl<T: StreamSource + ?Sized> StreamSource for &mut T {
    fn next_beat(&mut self) -> Option<Beat> {
        (**self).next_beat()
    }
}

impl<T: StreamSink + ?Sized> StreamSink for &mut T {
    fn offer(&mut self, beat: Beat) -> bool {
        (**self).offer(beat)
    }
}

/// In-memory source replaying queued frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSource {
    beats: VecDeque<Beat>,
}

impl FrameSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `bytes` as one frame; the final byte carries the end marker.
    /// Empty frames carry no bytes and are ignored.
    pub fn push_frame(&mut self, bytes: &[u8]) {
        if let Some((last, body)) = bytes.split_last() {
            self.beats.extend(body.iter().copied().map(Beat::byte));
            self.beats.push_back(Beat::last(*last));
        }
    }

    /// Builder form of [`FrameSource::push_frame`].
    #[must_use]
    pub fn with_frame(mut self, bytes: &[u8]) -> Self {
        self.push_frame(bytes);
        self
    }

    /// Bytes still queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.beats.len()
    }

    /// Returns `true` when every queued byte has been taken.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }
}

impl StreamSource for FrameSource {
    fn next_beat(&mut self) -> Option<Beat> {
        self.beats.pop_front()
    }
}

/// In-memory sink collecting accepted bytes and frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectingSink {
    bytes: Vec<u8>,
    frames: Vec<Vec<u8>>,
    open_frame: Vec<u8>,
    accept_limit: Option<usize>,
}

impl CollectingSink {
    /// Creates a sink that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts at most `limit` more bytes before refusing; `None` lifts the limit.
    #[allow(clippy::missing_const_for_fn)]
    pub fn set_accept_limit(&mut self, limit: Option<usize>) {
        self.accept_limit = limit;
    }

    /// Every accepted byte in order.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Completed frames in order.
    #[must_use]
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    /// Bytes of the frame currently being received.
    #[must_use]
    pub fn open_frame(&self) -> &[u8] {
        &self.open_frame
    }
}

impl StreamSink for CollectingSink {
    fn offer(&mut self, beat: Beat) -> bool {
        match self.accept_limit {
            Some(0) => return false,
            Some(ref mut limit) => *limit -= 1,
            None => {}
        }

        self.bytes.push(beat.data);
        self.open_frame.push(beat.data);
        if beat.last {
            self.frames.push(std::mem::take(&mut self.open_frame));
        }
        true
    }
}
