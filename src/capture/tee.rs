//! Output sinks and the tee that duplicates writes across them.

use std::cell::RefCell;
use std::io::{self, IsTerminal, Write};
use std::rc::Rc;

use encoding_rs::Encoding;

/// A destination for decoded text output.
pub trait OutputSink {
    fn write_text(&mut self, text: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Whether the sink is an interactive terminal.
    fn is_terminal(&self) -> bool {
        false
    }
}

/// Shared handle to a sink. The observer is driven from a single thread.
pub type SinkHandle = Rc<RefCell<dyn OutputSink>>;

/// In-memory capture of one test's output.
#[derive(Debug, Default)]
pub struct CaptureBuffer {
    text: String,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl OutputSink for CaptureBuffer {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.text.push_str(text);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The process's real stdout or stderr, at the bottom of every capture stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleSink {
    Stdout,
    Stderr,
}

impl ConsoleSink {
    pub fn handle(self) -> SinkHandle {
        Rc::new(RefCell::new(self))
    }
}

impl OutputSink for ConsoleSink {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        match self {
            ConsoleSink::Stdout => io::stdout().lock().write_all(text.as_bytes()),
            ConsoleSink::Stderr => io::stderr().lock().write_all(text.as_bytes()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ConsoleSink::Stdout => io::stdout().flush(),
            ConsoleSink::Stderr => io::stderr().flush(),
        }
    }

    fn is_terminal(&self) -> bool {
        match self {
            ConsoleSink::Stdout => io::stdout().is_terminal(),
            ConsoleSink::Stderr => io::stderr().is_terminal(),
        }
    }
}

/// Duplicates every write to all registered sinks, in registration order.
///
/// Raw bytes are decoded with the configured encoding before they reach the sinks, so every sink
/// sees identical text.
pub struct Tee {
    encoding: &'static Encoding,
    sinks: Vec<SinkHandle>,
}

impl Tee {
    pub fn new(encoding: &'static Encoding, sinks: Vec<SinkHandle>) -> Self {
        Self { encoding, sinks }
    }

    /// Decode `data` and write it to every sink.
    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let (text, _) = self.encoding.decode_without_bom_handling(data);
        self.write_text(&text)
    }

    pub fn write_lines<I, L>(&mut self, lines: I) -> io::Result<()>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        for line in lines {
            self.write(line.as_ref())?;
        }
        Ok(())
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl OutputSink for Tee {
    /// Every sink is written even if an earlier one fails; the first failure is returned.
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.borrow_mut().write_text(text) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.borrow_mut().flush() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Tee::write(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        OutputSink::flush(self)
    }
}
