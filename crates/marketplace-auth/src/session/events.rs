/*
[INPUT]:  Refresh failures from the HTTP layer, auth flow outcomes
[OUTPUT]: Broadcast channels for session expiry and user-facing notices
[POS]:    Session layer - application-wide signals
[UPDATE]: When adding new global events
*/

use tokio::sync::broadcast;
use tracing::debug;

use crate::types::NoticeLevel;

const EVENT_CAPACITY: usize = 16;
const NOTICE_CAPACITY: usize = 64;

/// Application-wide session signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Refresh failed; every holder of session state must drop it
    Expired,
}

/// Sender side of the session event bus, cheap to clone
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Broadcast `Expired`; returns the number of listeners reached
    pub fn emit_expired(&self) -> usize {
        let reached = self.tx.send(SessionEvent::Expired).unwrap_or(0);
        debug!(listeners = reached, "session expired broadcast");
        reached
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Transient user-facing message (toast equivalent)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Fan-out of notices to whatever front end is attached
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTICE_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Success, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Info, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Error, message.into());
    }

    fn publish(&self, level: NoticeLevel, message: String) {
        // No subscriber is fine: notices are fire-and-forget.
        let _ = self.tx.send(Notice { level, message });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_listeners() {
        let events = SessionEvents::new();
        assert_eq!(events.emit_expired(), 0);
    }

    #[test]
    fn test_every_subscriber_sees_expiry() {
        let events = SessionEvents::new();
        let mut a = events.subscribe();
        let mut b = events.clone().subscribe();

        assert_eq!(events.emit_expired(), 2);
        assert_eq!(a.try_recv().unwrap(), SessionEvent::Expired);
        assert_eq!(b.try_recv().unwrap(), SessionEvent::Expired);
    }

    #[test]
    fn test_notifier_levels() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.error("Signature rejected by user");
        notifier.success("Wallet connected successfully!");

        let first = rx.try_recv().unwrap();
        assert_eq!(first.level, NoticeLevel::Error);
        assert_eq!(first.message, "Signature rejected by user");
        assert_eq!(rx.try_recv().unwrap().level, NoticeLevel::Success);
    }
}
