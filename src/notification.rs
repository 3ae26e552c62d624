use std::time::{Duration, Instant};

pub const VISIBLE_FOR: Duration = Duration::from_millis(3000);
pub const FADE_FOR: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Visible,
    Fading,
    Gone,
}

/// A transient message. Once shown it always expires; nothing cancels it.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    shown_at: Instant,
}

impl Notification {
    pub fn new(message: impl Into<String>, kind: NotificationKind, shown_at: Instant) -> Self {
        Self {
            message: message.into(),
            kind,
            shown_at,
        }
    }

    pub fn phase(&self, now: Instant) -> Phase {
        let age = now.saturating_duration_since(self.shown_at);
        if age < VISIBLE_FOR {
            Phase::Visible
        } else if age < VISIBLE_FOR + FADE_FOR {
            Phase::Fading
        } else {
            Phase::Gone
        }
    }
}

/// Holds at most one notification; showing a new one replaces the old.
#[derive(Debug, Default)]
pub struct Notifier {
    current: Option<Notification>,
}

impl Notifier {
    pub fn show(&mut self, message: impl Into<String>, kind: NotificationKind, now: Instant) {
        self.current = Some(Notification::new(message, kind, now));
    }

    /// Drops the notification once it has fully faded.
    pub fn tick(&mut self, now: Instant) {
        if matches!(&self.current, Some(n) if n.phase(now) == Phase::Gone) {
            self.current = None;
        }
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }
}
