//! Single-slot, auto-dismissing status messages.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub shown_at: Instant,
}

/// Holds at most one notification; a newer one replaces the older.
#[derive(Debug, Clone)]
pub struct Notifier {
    ttl: Duration,
    current: Option<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL)
    }
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn show(&mut self, message: impl Into<String>, kind: NotificationKind) {
        self.show_at(message, kind, Instant::now());
    }

    pub fn show_at(&mut self, message: impl Into<String>, kind: NotificationKind, now: Instant) {
        self.current = Some(Notification {
            message: message.into(),
            kind,
            shown_at: now,
        });
    }

    pub fn current(&mut self) -> Option<&Notification> {
        self.current_at(Instant::now())
    }

    /// Returns the live notification, dropping it first if it has expired.
    pub fn current_at(&mut self, now: Instant) -> Option<&Notification> {
        let expired = self
            .current
            .as_ref()
            .is_some_and(|n| now.saturating_duration_since(n.shown_at) >= self.ttl);
        if expired {
            self.current = None;
        }
        self.current.as_ref()
    }

    /// Time left before the live notification auto-dismisses.
    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        self.current
            .as_ref()
            .map(|n| self.ttl.saturating_sub(now.saturating_duration_since(n.shown_at)))
            .filter(|left| !left.is_zero())
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_expires_after_ttl() {
        let start = Instant::now();
        let mut notifier = Notifier::new(Duration::from_secs(5));
        notifier.show_at("Minted 10 USDC", NotificationKind::Success, start);

        assert!(notifier
            .current_at(start + Duration::from_secs(4))
            .is_some());
        assert_eq!(
            notifier.remaining_at(start + Duration::from_secs(4)),
            Some(Duration::from_secs(1))
        );
        assert!(notifier
            .current_at(start + Duration::from_secs(5))
            .is_none());
    }

    #[test]
    fn newer_notification_replaces_older() {
        let start = Instant::now();
        let mut notifier = Notifier::default();
        notifier.show_at("first", NotificationKind::Pending, start);
        notifier.show_at(
            "second",
            NotificationKind::Error,
            start + Duration::from_secs(3),
        );

        let live = notifier
            .current_at(start + Duration::from_secs(6))
            .expect("second notification still live");
        assert_eq!(live.message, "second");
        assert_eq!(live.kind, NotificationKind::Error);

        notifier.dismiss();
        assert!(notifier.current_at(start + Duration::from_secs(6)).is_none());
    }
}
