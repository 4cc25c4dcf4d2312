use super::{Link, LinkError};
use std::collections::VecDeque;
use std::time::Duration;

/// In-memory link: records sent frames and hands out queued replies.
///
/// `recv` never sleeps; an empty queue is reported as an elapsed timeout.
#[derive(Debug, Default)]
pub struct Loopback {
    sent: Vec<Vec<u8>>,
    replies: VecDeque<Vec<u8>>,
    echo: bool,
}

impl Loopback {
    /// A link that never answers.
    pub fn new() -> Self {
        Self::default()
    }

    /// A link that reflects every sent frame back as the next reply.
    pub fn echo() -> Self {
        Loopback {
            echo: true,
            ..Self::default()
        }
    }

    /// Queue a frame for a later `recv`.
    pub fn push_reply(&mut self, frame: Vec<u8>) {
        self.replies.push_back(frame);
    }

    /// Frames sent so far, oldest first.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }
}

impl Link for Loopback {
    fn send(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        self.sent.push(frame.to_vec());
        if self.echo {
            self.replies.push_back(frame.to_vec());
        }
        Ok(())
    }

    fn recv(&mut self, _timeout: Duration) -> Result<Option<Vec<u8>>, LinkError> {
        Ok(self.replies.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_link_times_out() {
        let mut l = Loopback::new();
        l.send(&[1, 2, 3]).unwrap();
        assert_eq!(l.recv(Duration::from_millis(1)).unwrap(), None);
        assert_eq!(l.sent(), &[vec![1, 2, 3]]);
    }

    #[test]
    fn echo_reflects_in_order() {
        let mut l = Loopback::echo();
        l.send(&[1]).unwrap();
        l.send(&[2]).unwrap();
        assert_eq!(l.recv(Duration::ZERO).unwrap(), Some(vec![1]));
        assert_eq!(l.recv(Duration::ZERO).unwrap(), Some(vec![2]));
        assert_eq!(l.pending_replies(), 0);
    }
}
