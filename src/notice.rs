//! One-shot user-visible notices.

use std::fmt;

/// How long a notice stays visible.
pub const NOTICE_TTL_MS: u64 = 2200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.level, NoticeLevel::Error)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The notice currently on screen, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoticeSlot {
    current: Option<(Notice, u64)>,
}

impl NoticeSlot {
    /// Show `notice`, replacing whatever was visible.
    pub fn show(&mut self, notice: Notice, now_ms: u64) {
        self.current = Some((notice, now_ms.saturating_add(NOTICE_TTL_MS)));
    }

    pub fn current(&self) -> Option<&Notice> {
        self.current.as_ref().map(|(notice, _)| notice)
    }

    /// Drop the notice once its time is up. Returns `true` when it changed.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if self
            .current
            .as_ref()
            .is_some_and(|(_, expires_at)| now_ms >= *expires_at)
        {
            self.current = None;
            return true;
        }
        false
    }
}
