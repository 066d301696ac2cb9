//! Human-readable output feed.
//!
//! Numbered lines, newest first. The counter starts at 0, moves once per
//! logged event and is never reset; the retained lines are bounded.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::info;

pub struct OutputLog {
    counter: AtomicU64,
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
}

impl OutputLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            counter: AtomicU64::new(0),
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Log one event. Returns its number.
    pub fn push(&self, text: impl AsRef<str>) -> u64 {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let text = text.as_ref();
        info!(target: "castwire::output", n, "{text}");
        self.retain(format!("{n}.  {text}"));
        n
    }

    /// Unnumbered line; does not move the counter.
    pub fn push_raw(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        info!(target: "castwire::output", "{text}");
        self.retain(text.to_string());
    }

    pub fn counter(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Retained lines, newest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn render(&self) -> String {
        self.lines()
            .into_iter()
            .map(|l| format!("{l}\n"))
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|l| l.contains(needle))
    }

    fn retain(&self, line: String) {
        if self.capacity == 0 {
            return;
        }
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.push_front(line);
        lines.truncate(self.capacity);
    }
}
