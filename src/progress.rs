// Progress reporting for long-running index operations

use indicatif::ProgressBar;

/// Receives progress of one operation; `fraction` is in [0, 1]
pub trait ProgressReporter: Send + Sync {
    fn report(&self, fraction: f32, message: &str);
}

/// Discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _fraction: f32, _message: &str) {}
}

/// Drives a bar whose length is 100
impl ProgressReporter for ProgressBar {
    fn report(&self, fraction: f32, message: &str) {
        self.set_position((fraction.clamp(0.0, 1.0) * 100.0).round() as u64);
        self.set_message(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_position() {
        let bar = ProgressBar::hidden();
        bar.set_length(100);

        bar.report(0.42, "embedding");
        assert_eq!(bar.position(), 42);
        assert_eq!(bar.message(), "embedding");

        bar.report(3.0, "done");
        assert_eq!(bar.position(), 100);
    }
}
