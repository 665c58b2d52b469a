//! The capture loop: wait for a trigger, grab, write, repeat.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};
use winsnap_platform::{CaptureError, CaptureService};

use crate::bitmap::{self, WriteError};
use crate::grabber::FrameGrabber;
use crate::naming::OutputNamer;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("save failed: {0}")]
    Write(#[from] WriteError),
    #[error("prompt failed: {0}")]
    Prompt(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Capture,
    Stop,
}

/// Source of capture/stop decisions, polled once per iteration
pub trait TriggerSource {
    fn next_trigger(&mut self) -> io::Result<Trigger>;
}

/// Ask `question` on `output` and read one line from `input`.
/// Empty input (or end of input) yields `default`.
pub fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
    default: &str,
) -> io::Result<String> {
    write!(output, "{} (default: {}): ", question, default)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer.to_string())
    }
}

/// Interactive trigger: the stop token ends the run, any other line captures.
/// End of input also stops.
pub struct PromptTrigger<R, W> {
    input: R,
    output: W,
    stop_token: String,
}

impl<R: BufRead, W: Write> PromptTrigger<R, W> {
    pub fn new(input: R, output: W, stop_token: impl Into<String>) -> Self {
        Self {
            input,
            output,
            stop_token: stop_token.into(),
        }
    }
}

impl<R: BufRead, W: Write> TriggerSource for PromptTrigger<R, W> {
    fn next_trigger(&mut self) -> io::Result<Trigger> {
        write!(self.output, "Capture now? (quit: {}) ", self.stop_token)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(Trigger::Stop);
        }
        if line.trim() == self.stop_token {
            Ok(Trigger::Stop)
        } else {
            Ok(Trigger::Capture)
        }
    }
}

/// Non-interactive trigger that captures a fixed number of times
pub struct CountedTrigger {
    remaining: u32,
}

impl CountedTrigger {
    pub fn new(count: u32) -> Self {
        Self { remaining: count }
    }
}

impl TriggerSource for CountedTrigger {
    fn next_trigger(&mut self) -> io::Result<Trigger> {
        if self.remaining == 0 {
            return Ok(Trigger::Stop);
        }
        self.remaining -= 1;
        Ok(Trigger::Capture)
    }
}

/// One run against a single resolved target
pub struct CaptureSession<'a, S: CaptureService> {
    grabber: &'a FrameGrabber<S>,
    target: S::Target,
    namer: OutputNamer,
    captured: usize,
    last_saved: Option<PathBuf>,
}

impl<'a, S: CaptureService> CaptureSession<'a, S> {
    pub fn new(grabber: &'a FrameGrabber<S>, target: S::Target, namer: OutputNamer) -> Self {
        Self {
            grabber,
            target,
            namer,
            captured: 0,
            last_saved: None,
        }
    }

    /// Number of files written so far
    pub fn captured(&self) -> usize {
        self.captured
    }

    /// Most recently written file
    pub fn last_saved(&self) -> Option<&Path> {
        self.last_saved.as_deref()
    }

    /// Grab one frame and write it to the next numbered path
    pub fn capture_once(&mut self) -> Result<PathBuf, SessionError> {
        let frame = self.grabber.capture(self.target)?;
        let path = self.namer.next_path();
        let bytes = bitmap::write_frame(&path, frame)?;
        info!("saved capture to {} ({} bytes)", path.display(), bytes);
        self.captured += 1;
        self.last_saved = Some(path.clone());
        Ok(path)
    }

    /// Loop until the trigger source says stop. Any capture or write
    /// failure ends the run.
    pub fn run<T: TriggerSource>(&mut self, triggers: &mut T) -> Result<usize, SessionError> {
        loop {
            match triggers.next_trigger()? {
                Trigger::Stop => break,
                Trigger::Capture => {
                    let index = self.namer.next_index();
                    if let Err(e) = self.capture_once() {
                        error!("capture #{} failed: {}", index, e);
                        return Err(e);
                    }
                }
            }
        }
        info!("session finished after {} capture(s)", self.captured);
        Ok(self.captured)
    }
}
