use std::io::Write;

use visitcount_core::DisplayTarget;

/// Rewrites the current stdout line on every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalTarget;

impl DisplayTarget for TerminalTarget {
    fn set_text(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        // a closed stdout only loses the frame
        let _ = write!(out, "\r\x1b[2K{text}");
        let _ = out.flush();
    }
}
