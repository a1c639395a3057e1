//! Terminal progress bar for bulk transfers.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rnt_adapter::{ContinueOrCancel, ProgressSink};

/// Draws a transfer on stderr. Hidden in JSON mode.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(total: usize, message: impl Into<String>, hidden: bool) -> anyhow::Result<Self> {
        let target = if hidden {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        };
        let bar = ProgressBar::with_draw_target(Some(to_u64(total)), target);
        let style = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes}")?
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_message(Into::<String>::into(message));
        Ok(Self { bar })
    }

    pub fn finish(&self) {
        self.bar.finish();
    }
}

impl ProgressSink for BarProgress {
    fn advance(&mut self, current: usize) -> ContinueOrCancel {
        self.bar.set_position(to_u64(current));
        ContinueOrCancel::Continue
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}

fn to_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}
