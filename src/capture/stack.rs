//! Capture stack: the active output destinations per nested test context
//!
//! ## State machine
//!
//! - **Idle**: no frames. Writes go straight to the base sinks (normally the console).
//! - **Capturing**: one or more frames. Each push saves the current destinations in a
//!   [`CaptureFrame`], allocates fresh capture buffers, opens fresh telemetry pipe handles and
//!   installs tees of "new buffer + previous sink". Each pop drops the current destinations
//!   (closing their pipe handles) and restores the saved ones exactly.
//!
//! Pushes and pops are strictly LIFO. Popping an empty stack is a no-op.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use encoding_rs::Encoding;

use super::tee::{CaptureBuffer, ConsoleSink, SinkHandle, Tee};
use crate::config::ObserverConfig;
use crate::pipe::PipeHandle;

/// A standard output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// One of the two telemetry pipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryPipe {
    A,
    B,
}

/// Whether anything is being captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
}

/// What a frame was pushed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameScope {
    Context(String),
    Test(String),
}

/// The four active output destinations, plus the buffers backing the current captures.
struct Destinations {
    stdout: SinkHandle,
    stderr: SinkHandle,
    stdout_capture: Option<Rc<RefCell<CaptureBuffer>>>,
    stderr_capture: Option<Rc<RefCell<CaptureBuffer>>>,
    telemetry_a: Option<PipeHandle>,
    telemetry_b: Option<PipeHandle>,
}

/// Destinations saved when a context was entered.
pub struct CaptureFrame {
    scope: FrameScope,
    saved: Destinations,
}

impl CaptureFrame {
    pub fn scope(&self) -> &FrameScope {
        &self.scope
    }
}

/// Owner of the "current" stdout/stderr sinks and telemetry pipe handles.
pub struct CaptureStack {
    encoding: &'static Encoding,
    telemetry_a_path: PathBuf,
    telemetry_b_path: PathBuf,
    frames: Vec<CaptureFrame>,
    active: Destinations,
}

impl CaptureStack {
    /// Create an idle stack over the given base sinks.
    pub fn new(
        stdout: SinkHandle,
        stderr: SinkHandle,
        encoding: &'static Encoding,
        telemetry_a_path: impl Into<PathBuf>,
        telemetry_b_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            encoding,
            telemetry_a_path: telemetry_a_path.into(),
            telemetry_b_path: telemetry_b_path.into(),
            frames: Vec::new(),
            active: Destinations {
                stdout,
                stderr,
                stdout_capture: None,
                stderr_capture: None,
                telemetry_a: None,
                telemetry_b: None,
            },
        }
    }

    /// Create an idle stack over the process console, with pipe paths from `config`.
    pub fn console(config: &ObserverConfig) -> Self {
        Self::new(
            ConsoleSink::Stdout.handle(),
            ConsoleSink::Stderr.handle(),
            config.encoding,
            config.telemetry_a.path.clone(),
            config.telemetry_b.path.clone(),
        )
    }

    /// Take encoding and pipe paths from `config` for frames pushed from now on.
    pub fn retarget(&mut self, config: &ObserverConfig) {
        self.encoding = config.encoding;
        self.telemetry_a_path = config.telemetry_a.path.clone();
        self.telemetry_b_path = config.telemetry_b.path.clone();
    }

    pub fn state(&self) -> CaptureState {
        if self.frames.is_empty() {
            CaptureState::Idle
        } else {
            CaptureState::Capturing
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Scope of the innermost frame, if any.
    pub fn current_scope(&self) -> Option<&FrameScope> {
        self.frames.last().map(CaptureFrame::scope)
    }

    pub fn enter_context(&mut self, name: &str) {
        self.push(FrameScope::Context(name.to_string()));
    }

    pub fn enter_test(&mut self, test_id: &str) {
        self.push(FrameScope::Test(test_id.to_string()));
    }

    /// Pop the innermost frame. Returns `false` when the stack was already empty.
    pub fn exit_context(&mut self) -> bool {
        self.pop()
    }

    /// Pop the innermost frame. Returns `false` when the stack was already empty.
    pub fn exit_test(&mut self) -> bool {
        self.pop()
    }

    /// Pop every remaining frame. Returns how many were popped.
    pub fn finalize(&mut self) -> usize {
        let mut popped = 0;
        while self.pop() {
            popped += 1;
        }
        if popped > 0 {
            tracing::debug!(popped, "drained leftover capture frames");
        }
        popped
    }

    fn push(&mut self, scope: FrameScope) {
        let stdout_capture = Rc::new(RefCell::new(CaptureBuffer::new()));
        let stderr_capture = Rc::new(RefCell::new(CaptureBuffer::new()));

        let stdout: SinkHandle = Rc::new(RefCell::new(Tee::new(
            self.encoding,
            vec![stdout_capture.clone() as SinkHandle, self.active.stdout.clone()],
        )));
        let stderr: SinkHandle = Rc::new(RefCell::new(Tee::new(
            self.encoding,
            vec![stderr_capture.clone() as SinkHandle, self.active.stderr.clone()],
        )));

        let fresh = Destinations {
            stdout,
            stderr,
            stdout_capture: Some(stdout_capture),
            stderr_capture: Some(stderr_capture),
            telemetry_a: open_telemetry(&self.telemetry_a_path),
            telemetry_b: open_telemetry(&self.telemetry_b_path),
        };

        let saved = std::mem::replace(&mut self.active, fresh);
        tracing::trace!(?scope, depth = self.frames.len() + 1, "capture frame pushed");
        self.frames.push(CaptureFrame { scope, saved });
    }

    fn pop(&mut self) -> bool {
        match self.frames.pop() {
            Some(frame) => {
                tracing::trace!(scope = ?frame.scope, depth = self.frames.len(), "capture frame popped");
                // Dropping the replaced destinations closes this frame's pipe handles.
                self.active = frame.saved;
                true
            }
            None => {
                tracing::debug!("capture stack already empty; ignoring pop");
                false
            }
        }
    }

    /// The current sink for `stream`.
    pub fn sink(&self, stream: Stream) -> SinkHandle {
        match stream {
            Stream::Stdout => self.active.stdout.clone(),
            Stream::Stderr => self.active.stderr.clone(),
        }
    }

    /// Decode `data` and write it to the current sink for `stream`.
    pub fn write(&self, stream: Stream, data: &[u8]) -> io::Result<()> {
        let (text, _) = self.encoding.decode_without_bom_handling(data);
        self.sink(stream).borrow_mut().write_text(&text)
    }

    /// Text captured so far for `stream` in the innermost frame.
    pub fn captured(&self, stream: Stream) -> Option<String> {
        let buffer = match stream {
            Stream::Stdout => self.active.stdout_capture.as_ref(),
            Stream::Stderr => self.active.stderr_capture.as_ref(),
        };
        buffer.map(|b| b.borrow().contents().to_string())
    }

    /// The innermost frame's handle on a telemetry pipe, if it could be opened.
    pub fn telemetry(&mut self, pipe: TelemetryPipe) -> Option<&mut PipeHandle> {
        match pipe {
            TelemetryPipe::A => self.active.telemetry_a.as_mut(),
            TelemetryPipe::B => self.active.telemetry_b.as_mut(),
        }
    }
}

/// Open a fresh handle for one frame; a missing pipe means no telemetry for it.
fn open_telemetry(path: &Path) -> Option<PipeHandle> {
    match PipeHandle::open(path) {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!("{e}; telemetry will be reported as unavailable");
            None
        }
    }
}
