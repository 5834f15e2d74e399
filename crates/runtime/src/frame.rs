use foundation::time::Millis;

/// Metadata of one painted frame.
///
/// Render hooks receive this so they can be driven deterministically in tests
/// and replays.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Event-loop time at which the frame was painted.
    pub time: Millis,
}

impl Frame {
    pub fn new(index: u64, time: Millis) -> Self {
        Self { index, time }
    }

    pub fn next(self, time: Millis) -> Self {
        Self::new(self.index + 1, time)
    }
}
