use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    raised_at: Instant,
}

/// Short-lived notifications. Toasts never block input; they expire after
/// `ttl` and at most `capacity` are kept.
pub struct Toasts {
    queue: VecDeque<Toast>,
    ttl: Duration,
    capacity: usize,
}

impl Toasts {
    pub fn new(ttl: Duration) -> Self {
        Toasts {
            queue: VecDeque::new(),
            ttl,
            capacity: 4,
        }
    }

    pub fn push(&mut self, level: ToastLevel, message: impl Into<String>) {
        let message = message.into();
        debug!(?level, %message, "toast");
        if self.queue.len() >= self.capacity {
            self.queue.pop_front();
        }
        self.queue.push_back(Toast {
            message,
            level,
            raised_at: Instant::now(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ToastLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(ToastLevel::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ToastLevel::Error, message);
    }

    pub fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.queue
            .retain(|t| now.saturating_duration_since(t.raised_at) < ttl);
    }

    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.queue.iter()
    }

    pub fn latest(&self) -> Option<&Toast> {
        self.queue.back()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
