//! Count-up animation into a display target.
//!
//! Frames are driven by a periodic tick. Each frame evaluates the eased
//! progress in O(1); the last frame always shows the exact target value and
//! nothing is scheduled after it.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

/// Placeholder shown while the count is being acquired.
pub const LOADING_PLACEHOLDER: &str = "…";

/// Default animation length.
pub const DEFAULT_DURATION_MS: u64 = 2000;

/// Frame period (~60 Hz).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Something that can show a line of text, e.g. a page element.
pub trait DisplayTarget: Send + Sync {
    fn set_text(&self, text: &str);
}

/// Ease-in-out quadratic. Maps `[0, 1]` onto `[0, 1]`, non-decreasing.
pub fn ease_in_out(p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    if p < 0.5 {
        2.0 * p * p
    } else {
        1.0 - (-2.0 * p + 2.0).powi(2) / 2.0
    }
}

/// Integer with `,` thousands separators.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// One from/to transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    pub from: u64,
    pub to: u64,
    pub duration_ms: u64,
}

impl Animation {
    pub fn new(from: u64, to: u64, duration_ms: u64) -> Self {
        Self {
            from,
            to,
            duration_ms,
        }
    }

    /// Linear progress at `elapsed_ms`, clamped to `[0, 1]`.
    pub fn progress(&self, elapsed_ms: u64) -> f64 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        (elapsed_ms as f64 / self.duration_ms as f64).min(1.0)
    }

    /// Value shown at `elapsed_ms`.
    pub fn value_at(&self, elapsed_ms: u64) -> u64 {
        let p = self.progress(elapsed_ms);
        if p >= 1.0 {
            return self.to;
        }
        let delta = self.to as f64 - self.from as f64;
        let value = (self.from as f64 + delta * ease_in_out(p)).floor();
        value.max(0.0) as u64
    }
}

/// Renders animations and remembers what is on screen.
pub struct Animator<D> {
    target: Option<D>,
    current: Mutex<Option<u64>>,
}

impl<D: DisplayTarget> Animator<D> {
    pub fn new(target: Option<D>) -> Self {
        Self {
            target,
            current: Mutex::new(None),
        }
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<&D> {
        self.target.as_ref()
    }

    /// Value of the last frame written, if any.
    pub fn current(&self) -> Option<u64> {
        self.current.lock().ok().and_then(|c| *c)
    }

    /// Show arbitrary text, e.g. the loading placeholder.
    pub fn show_text(&self, text: &str) {
        if let Some(target) = &self.target {
            target.set_text(text);
        }
    }

    /// Show a value immediately.
    pub fn show(&self, value: u64) {
        if let Some(target) = &self.target {
            target.set_text(&format_count(value));
            if let Ok(mut current) = self.current.lock() {
                *current = Some(value);
            }
        }
    }

    /// Animate from `from` to `to` over `duration_ms`. No-op without a target.
    pub async fn render(&self, from: u64, to: u64, duration_ms: u64) {
        if self.target.is_none() {
            return;
        }

        let animation = Animation::new(from, to, duration_ms);
        let start = Instant::now();
        let mut ticker = tokio::time::interval(FRAME_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            self.show(animation.value_at(elapsed_ms));
            if animation.progress(elapsed_ms) >= 1.0 {
                break;
            }
        }
    }
}

/// Target that keeps every frame, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    frames: Mutex<Vec<String>>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<String> {
        self.frames.lock().ok().and_then(|f| f.last().cloned())
    }
}

impl DisplayTarget for RecordingTarget {
    fn set_text(&self, text: &str) {
        if let Ok(mut frames) = self.frames.lock() {
            frames.push(text.to_string());
        }
    }
}

impl<T: DisplayTarget + ?Sized> DisplayTarget for std::sync::Arc<T> {
    fn set_text(&self, text: &str) {
        (**self).set_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn easing_is_monotonic_and_pinned() {
        assert_eq!(ease_in_out(0.0), 0.0);
        assert_eq!(ease_in_out(1.0), 1.0);
        assert_eq!(ease_in_out(0.5), 0.5);
        let mut prev = 0.0;
        for i in 0..=1000 {
            let e = ease_in_out(i as f64 / 1000.0);
            assert!(e >= prev);
            prev = e;
        }
    }

    #[test]
    fn formats_with_separators() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn animation_hits_endpoints() {
        let anim = Animation::new(95, 101, 2000);
        assert_eq!(anim.value_at(0), 95);
        assert_eq!(anim.value_at(2000), 101);
        assert_eq!(anim.value_at(10_000), 101);
        assert_eq!(Animation::new(5, 9, 0).value_at(0), 9);
    }

    #[test]
    fn animation_counts_down_too() {
        let anim = Animation::new(10, 4, 100);
        assert_eq!(anim.value_at(0), 10);
        assert!(anim.value_at(50) <= 10 && anim.value_at(50) >= 4);
        assert_eq!(anim.value_at(100), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn render_ends_on_target_value() {
        let target = Arc::new(RecordingTarget::new());
        let animator = Animator::new(Some(Arc::clone(&target)));

        animator.render(90, 101, 500).await;

        let frames = target.frames();
        assert!(frames.len() > 2);
        assert_eq!(frames.first().map(String::as_str), Some("90"));
        assert_eq!(target.last().as_deref(), Some("101"));
        assert_eq!(animator.current(), Some(101));

        let values: Vec<u64> = frames.iter().map(|f| f.parse().unwrap()).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn render_without_target_is_noop() {
        let animator: Animator<RecordingTarget> = Animator::new(None);
        animator.render(1, 5, 500).await;
        animator.show(5);
        assert_eq!(animator.current(), None);
    }
}
