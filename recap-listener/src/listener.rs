use std::borrow::Cow;
use std::io::BufRead;

use color_eyre::eyre::{Result, WrapErr};
use recap::log::*;
use recap::run::{RunState, TimedEvent};
use time::OffsetDateTime;

/// Feeds a newline-delimited stream of lifecycle events into a [`RunState`].
/// Bad lines are skipped with a warning, never fatal.
#[derive(Debug, Default)]
pub struct Listener {
    state: RunState,
    lines_read: usize,
    malformed: usize,
}

impl Listener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// Handle one line of input, stamping untimed events with `now`. Returns
    /// the recap once the run completes.
    pub fn handle_line(&mut self, line: &str, now: OffsetDateTime) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match TimedEvent::parse(line) {
            Ok(timed) => {
                trace!("listener: {} event", timed.event.name());
                self.state.apply(&timed.event, timed.at_or(now))
            }
            Err(err) => {
                warn!(
                    "listener: skipping malformed event on line {}: {}",
                    self.lines_read, err
                );
                self.malformed += 1;
                None
            }
        }
    }

    /// Read events until the run completes. Stops at the completion event;
    /// nothing after it is consumed. `None` means the stream ended first.
    /// Lines that are not valid UTF-8 are decoded lossily rather than
    /// rejected.
    #[tracing::instrument(skip(self, reader))]
    pub fn listen<R: BufRead>(&mut self, mut reader: R) -> Result<Option<String>> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .wrap_err("Failed reading event stream")?;
            if read == 0 {
                break;
            }
            self.lines_read += 1;
            let line = String::from_utf8_lossy(&buf);
            if let Cow::Owned(_) = line {
                debug!(
                    "listener: line {} is not valid utf-8, decoding lossily",
                    self.lines_read
                );
            }
            if let Some(recap) = self.handle_line(&line, OffsetDateTime::now_utc()) {
                info!(
                    "listener: run complete after {} lines ({} malformed)",
                    self.lines_read, self.malformed
                );
                return Ok(Some(recap));
            }
        }
        warn!("listener: event stream ended before playbook stats, no recap to send");
        Ok(None)
    }
}
