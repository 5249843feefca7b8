//! Transient user-facing messages.
//!
//! Exactly one notice is visible at a time; posting replaces it, and it
//! disappears on its own once its time-to-live has elapsed.

use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub posted_at: Instant,
    pub ttl: Duration,
}

impl Notice {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.posted_at) >= self.ttl
    }
}

#[derive(Debug, Clone)]
pub struct NoticeBoard {
    ttl: Duration,
    current: Option<Notice>,
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn post(&mut self, level: NoticeLevel, text: impl Into<String>) -> &Notice {
        self.post_at(level, text, Instant::now())
    }

    pub fn post_at(&mut self, level: NoticeLevel, text: impl Into<String>, now: Instant) -> &Notice {
        let notice = Notice {
            level,
            text: text.into(),
            posted_at: now,
            ttl: self.ttl,
        };
        match level {
            NoticeLevel::Error => tracing::warn!(notice = %notice.text, "notice posted"),
            _ => tracing::info!(notice = %notice.text, "notice posted"),
        }
        self.current.insert(notice)
    }

    pub fn current(&self) -> Option<&Notice> {
        self.current_at(Instant::now())
    }

    pub fn current_at(&self, now: Instant) -> Option<&Notice> {
        self.current.as_ref().filter(|n| !n.is_expired_at(now))
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_NOTICE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_expires_after_ttl() {
        let mut board = NoticeBoard::new(Duration::from_secs(3));
        let t0 = Instant::now();
        board.post_at(NoticeLevel::Success, "Datos enviados correctamente", t0);

        let shown = board.current_at(t0 + Duration::from_millis(2999)).unwrap();
        assert_eq!(shown.level, NoticeLevel::Success);
        assert_eq!(shown.text, "Datos enviados correctamente");
        assert!(board.current_at(t0 + Duration::from_secs(3)).is_none());
    }

    #[test]
    fn posting_replaces_and_clear_removes() {
        let mut board = NoticeBoard::default();
        board.post(NoticeLevel::Info, "uno");
        board.post(NoticeLevel::Error, "dos");
        assert_eq!(board.current().unwrap().text, "dos");

        board.clear();
        assert!(board.current().is_none());
    }
}
