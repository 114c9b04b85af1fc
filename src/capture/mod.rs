//! Output capture for nested test contexts
//!
//! ## Modules
//!
//! - `tee` - output sinks and the `Tee` that fans writes out to several of them
//! - `stack` - the capture stack that swaps the active sinks and telemetry pipes per context
//!
//! ## Design
//!
//! Nothing here touches process-wide stdout/stderr. Code that wants its output captured asks the
//! [`CaptureStack`] for the current sink of a [`Stream`] and writes to that. Entering a test installs
//! a tee of "this test's buffer" plus "whatever was active before", so output stays visible live
//! while being recorded.

pub mod stack;
pub mod tee;

pub use stack::{CaptureStack, CaptureState, FrameScope, Stream, TelemetryPipe};
pub use tee::{CaptureBuffer, ConsoleSink, OutputSink, SinkHandle, Tee};
