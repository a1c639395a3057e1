//! Cooperative progress reporting and cancellation for long transfers.

/// Answer of a [`ProgressSink`] before each unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueOrCancel {
    Continue,
    Cancel,
}

impl ContinueOrCancel {
    pub fn is_cancel(self) -> bool {
        matches!(self, Self::Cancel)
    }
}

/// Receives the current position of a bulk transfer once per block, sector
/// or polling interval, and decides whether it goes on.
pub trait ProgressSink {
    /// `current` is the address or byte offset of the unit about to be
    /// transferred. Every unit below it is already done, so cancelling here
    /// leaves `current` and everything after it untouched.
    fn advance(&mut self, current: usize) -> ContinueOrCancel;

    /// Called when a write is cancelled part way. Returning `false` keeps
    /// writing.
    fn confirm_cancel_write(&mut self) -> bool {
        true
    }
}

impl<F> ProgressSink for F
where
    F: FnMut(usize) -> ContinueOrCancel,
{
    fn advance(&mut self, current: usize) -> ContinueOrCancel {
        self(current)
    }
}

/// Sink that never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn advance(&mut self, _current: usize) -> ContinueOrCancel {
        ContinueOrCancel::Continue
    }
}

/// Sink that cancels once `current` reaches a threshold.
#[derive(Debug, Clone, Copy)]
pub struct CancelAt {
    pub threshold: usize,
    pub confirm: bool,
}

impl CancelAt {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            confirm: true,
        }
    }
}

impl ProgressSink for CancelAt {
    fn advance(&mut self, current: usize) -> ContinueOrCancel {
        if current >= self.threshold {
            ContinueOrCancel::Cancel
        } else {
            ContinueOrCancel::Continue
        }
    }

    fn confirm_cancel_write(&mut self) -> bool {
        self.confirm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        let mut sink = |current: usize| {
            seen.push(current);
            ContinueOrCancel::Continue
        };
        let dyn_sink: &mut dyn ProgressSink = &mut sink;
        assert_eq!(dyn_sink.advance(32), ContinueOrCancel::Continue);
        assert!(dyn_sink.confirm_cancel_write());
        assert_eq!(seen, vec![32]);
    }

    #[test]
    fn test_cancel_at() {
        let mut sink = CancelAt::new(64);
        assert!(!sink.advance(32).is_cancel());
        assert!(sink.advance(64).is_cancel());
    }
}
