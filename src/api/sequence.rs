//! Last-write-wins bookkeeping for overlapping requests.
//!
//! A caller takes a ticket before each request. When the response arrives it
//! is applied only if no newer ticket has been issued since; older responses
//! are dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::logging::log_stale_response;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub struct RequestSequencer {
    name: &'static str,
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            latest: AtomicU64::new(0),
        }
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// `Some(value)` if `ticket` is still the newest, otherwise `None`.
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        let latest = self.latest.load(Ordering::SeqCst);
        if latest == ticket.0 {
            Some(value)
        } else {
            log_stale_response(self.name, ticket.0, latest);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_ticket_wins() {
        let seq = RequestSequencer::new("simulate");
        let first = seq.issue();
        let second = seq.issue();
        assert!(second > first);
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));

        // first resolves after second was issued
        assert_eq!(seq.accept(first, "old"), None);
        assert_eq!(seq.accept(second, "new"), Some("new"));
    }

    #[test]
    fn test_single_request_applies() {
        let seq = RequestSequencer::new("forecast");
        let t = seq.issue();
        assert_eq!(seq.accept(t, 7), Some(7));
        assert_eq!(t.id(), 1);
    }

    #[tokio::test]
    async fn test_out_of_order_resolution() {
        use std::sync::Arc;
        use tokio::time::{sleep, Duration};

        let seq = Arc::new(RequestSequencer::new("ask"));
        let slow_ticket = seq.issue();
        let slow = {
            let seq = seq.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(30)).await;
                seq.accept(slow_ticket, "slow")
            })
        };
        let fast_ticket = seq.issue();
        let fast = {
            let seq = seq.clone();
            tokio::spawn(async move { seq.accept(fast_ticket, "fast") })
        };

        assert_eq!(fast.await.unwrap(), Some("fast"));
        assert_eq!(slow.await.unwrap(), None);
    }
}
