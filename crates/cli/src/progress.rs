//! Progress indicators

use indicatif::{ProgressBar, ProgressStyle};

use callmap_core::ProgressSink;

/// Spinner-backed progress sink for the analyze pipeline.
///
/// On a non-TTY the spinner draws nothing; the final summary is printed by
/// the command itself.
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    pub fn new(msg: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} ({pos})")
                .unwrap(),
        );
        bar.set_message(msg.to_string());
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { bar }
    }

    pub fn finish(&self, msg: &str) {
        self.bar.finish_with_message(msg.to_string());
    }
}

impl ProgressSink for SpinnerProgress {
    fn report(&self, message: &str, increment: u64) {
        self.bar.set_message(message.to_string());
        if increment > 0 {
            self.bar.inc(increment);
        }
    }
}
