//! Scripted transport for unit tests.
//!
//! Replies are queued ahead of time; each `get_feature_report` call pops one
//! poll result. Sent reports are recorded so tests can inspect the exact
//! frames after the transport has been moved into a handle.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{FeatureTransport, HidCommonError, HidCommonResult, REPORT_ID};

/// Outcome of one poll of the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockPoll {
    /// Nothing pending yet
    Empty,
    /// A reply payload (without report ID)
    Reply(Vec<u8>),
    /// The read itself fails
    Fail,
}

#[derive(Debug, Default)]
struct MockState {
    polls: VecDeque<MockPoll>,
    sent: Vec<Vec<u8>>,
    fail_sends: bool,
}

/// Cloneable handle; all clones share the same script and history.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn queue_reply(&self, payload: impl Into<Vec<u8>>) {
        let payload = payload.into();
        self.with_state(|s| s.polls.push_back(MockPoll::Reply(payload)));
    }

    pub fn queue_poll(&self, poll: MockPoll) {
        self.with_state(|s| s.polls.push_back(poll));
    }

    pub fn fail_sends(&self, fail: bool) {
        self.with_state(|s| s.fail_sends = fail);
    }

    /// Payloads sent so far, report ID stripped.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.with_state(|s| s.sent.clone())
    }

    pub fn pending_polls(&self) -> usize {
        self.with_state(|s| s.polls.len())
    }
}

impl FeatureTransport for MockTransport {
    fn send_feature_report(&mut self, data: &[u8]) -> HidCommonResult<()> {
        self.with_state(|s| {
            if s.fail_sends {
                return Err(HidCommonError::WriteError("scripted failure".to_string()));
            }
            match data.split_first() {
                Some((&REPORT_ID, payload)) => {
                    s.sent.push(payload.to_vec());
                    Ok(())
                }
                _ => Err(HidCommonError::InvalidReport(
                    "missing report ID".to_string(),
                )),
            }
        })
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> HidCommonResult<usize> {
        self.with_state(|s| match s.polls.pop_front() {
            None | Some(MockPoll::Empty) => Ok(0),
            Some(MockPoll::Fail) => Err(HidCommonError::ReadError("scripted failure".to_string())),
            Some(MockPoll::Reply(payload)) => {
                let n = payload.len().min(buf.len().saturating_sub(1));
                if let Some((id, rest)) = buf.split_first_mut() {
                    *id = REPORT_ID;
                    if let (Some(dst), Some(src)) = (rest.get_mut(..n), payload.get(..n)) {
                        dst.copy_from_slice(src);
                    }
                }
                Ok(n + 1)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sent_reports_are_recorded_without_report_id() -> HidCommonResult<()> {
        let mock = MockTransport::new();
        let mut transport = mock.clone();
        transport.send_feature_report(&[REPORT_ID, 0x04])?;
        assert_eq!(mock.sent(), vec![vec![0x04]]);
        Ok(())
    }

    #[test]
    fn test_clones_share_script_across_threads() -> HidCommonResult<()> {
        let mock = MockTransport::new();
        let mut transport = mock.clone();
        let worker = std::thread::spawn(move || transport.send_feature_report(&[REPORT_ID, 0x01, 0x02]));
        worker
            .join()
            .map_err(|e| HidCommonError::WriteError(format!("worker panicked: {e:?}")))??;
        mock.queue_poll(MockPoll::Empty);
        assert_eq!(mock.sent(), vec![vec![0x01, 0x02]]);
        assert_eq!(mock.pending_polls(), 1);
        Ok(())
    }

    #[test]
    fn test_reply_is_prefixed_with_report_id() -> HidCommonResult<()> {
        let mock = MockTransport::new();
        mock.queue_poll(MockPoll::Empty);
        mock.queue_reply(vec![0x04, b'3']);
        let mut transport = mock.clone();
        let mut buf = [0u8; 8];
        assert_eq!(transport.get_feature_report(&mut buf)?, 0);
        assert_eq!(transport.get_feature_report(&mut buf)?, 3);
        assert_eq!(&buf[..3], &[REPORT_ID, 0x04, b'3']);
        Ok(())
    }
}
