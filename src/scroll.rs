use std::time::Duration;

use tokio::time::Instant;

/// Scroll position reported by whatever is showing the gallery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    pub scroll_y: f64,
    pub viewport_height: f64,
    pub document_height: f64,
}

impl ViewportMetrics {
    pub fn new(scroll_y: f64, viewport_height: f64, document_height: f64) -> Self {
        Self {
            scroll_y,
            viewport_height,
            document_height,
        }
    }

    /// True once the bottom edge of the viewport is within `threshold` of the
    /// end of the document.
    pub fn near_bottom(&self, threshold: f64) -> bool {
        self.scroll_y + self.viewport_height >= self.document_height - threshold
    }
}

/// Leading-edge throttle: the first call passes, then calls are refused until
/// `interval` has elapsed since the last accepted one.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Earliest instant the next call will be admitted, if one was admitted before.
    pub fn next_slot(&self) -> Option<Instant> {
        self.last.map(|last| last + self.interval)
    }

    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
