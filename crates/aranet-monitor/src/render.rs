//! Terminal presentation of a live session.

use std::io::{self, Stdout, Write};

use aranet_core::{AgeLine, LiveFrame, Renderer};
use tracing::debug;

use crate::format::{self, Markup};

/// Draws frames to a terminal, refreshing the age line in place.
///
/// Each frame starts on a fresh line and leaves the cursor at the start of
/// its age line, so the next age refresh overwrites it.
pub struct TerminalRenderer<W: Write = Stdout> {
    out: W,
    markup: Markup,
}

impl TerminalRenderer<Stdout> {
    /// Render to stdout.
    pub fn stdout(no_color: bool) -> Self {
        Self::new(io::stdout(), Markup::terminal(no_color))
    }
}

impl<W: Write> TerminalRenderer<W> {
    /// Render to any writer.
    pub fn new(out: W, markup: Markup) -> Self {
        Self { out, markup }
    }

    /// Give back the writer.
    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush()) {
            debug!("Failed to write to terminal: {}", e);
        }
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn show_reading(&mut self, frame: &LiveFrame) {
        let text = format!("\n{}\r", format::format_frame(frame, self.markup));
        self.write(&text);
    }

    fn show_age(&mut self, line: &AgeLine) {
        let text = format!("{}\r", format::format_age_line(line));
        self.write(&text);
    }

    fn notification_body(&self, frame: &LiveFrame) -> String {
        format::format_frame(frame, Markup::Html)
    }
}
