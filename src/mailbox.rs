//! Single-slot mailbox between the frame producer and the session owner.
//!
//! The producer runs at camera rate and must never wait on the consumer:
//! `post` replaces whatever is in the slot and returns immediately. The
//! consumer only ever observes the latest delivered value; intermediate
//! values are dropped under load, which the debounce logic tolerates.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    available: Condvar,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            available: Condvar::new(),
        }
    }

    /// Deliver a value, overwriting any undelivered predecessor. Never blocks
    /// beyond the uncontended slot lock.
    pub fn post(&self, value: T) {
        let mut slot = self.slot.lock().expect("mailbox lock poisoned");
        *slot = Some(value);
        self.available.notify_one();
    }

    /// Take the latest value without waiting.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().expect("mailbox lock poisoned").take()
    }

    /// Wait up to `timeout` for a value.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock().expect("mailbox lock poisoned");
        loop {
            if let Some(value) = slot.take() {
                return Some(value);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let (guard, result) = self
                .available
                .wait_timeout(slot, remaining)
                .expect("mailbox lock poisoned");
            slot = guard;
            if result.timed_out() && slot.is_none() {
                return None;
            }
        }
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn later_post_overwrites_earlier() {
        let mailbox = Mailbox::new();
        mailbox.post(1);
        mailbox.post(2);
        mailbox.post(3);
        assert_eq!(mailbox.take(), Some(3));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn recv_timeout_returns_none_when_empty() {
        let mailbox: Mailbox<u32> = Mailbox::new();
        assert_eq!(mailbox.recv_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn recv_timeout_wakes_on_post() {
        let mailbox = Arc::new(Mailbox::new());
        let producer = Arc::clone(&mailbox);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            producer.post(7u32);
        });
        let got = mailbox.recv_timeout(Duration::from_secs(2));
        handle.join().unwrap();
        assert_eq!(got, Some(7));
    }
}
