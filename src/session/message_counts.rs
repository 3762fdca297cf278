use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-session message statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct MessageCounts {
    received: u64,
    sent: u64,
    last_received: Option<DateTime<Utc>>,
    last_sent: Option<DateTime<Utc>>,
}

impl MessageCounts {
    pub fn new() -> Self {
        MessageCounts::default()
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// Any message from the peer, framed or not
    pub fn increment_received(&mut self) {
        self.received += 1;
        self.last_received = Some(Utc::now());
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn increment_sent(&mut self) {
        self.sent += 1;
        self.last_sent = Some(Utc::now());
    }

    pub fn last_received(&self) -> Option<DateTime<Utc>> {
        self.last_received
    }

    pub fn last_sent(&self) -> Option<DateTime<Utc>> {
        self.last_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut counts = MessageCounts::new();
        assert!(counts.last_received().is_none());
        assert!(counts.last_sent().is_none());
        counts.increment_received();
        counts.increment_received();
        counts.increment_sent();
        assert_eq!((counts.received(), counts.sent()), (2, 1));
        assert!(counts.last_received().is_some());
        assert!(counts.last_sent().unwrap() >= counts.last_received().unwrap());
    }
}
