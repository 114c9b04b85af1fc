//! Non-blocking named-pipe reader
//!
//! External producers (a flight dynamics simulator, a ground-station proxy) stream diagnostic text
//! into named pipes while tests run. The observer drains whatever is available at event time and
//! never waits on a producer for longer than one readiness wait.
//!
//! ## Behavior
//!
//! - Pipes are opened read-only with `O_NONBLOCK`, so opening never waits for a writer.
//! - [`PipeReader::drain`] polls for readability with a bounded timeout and reads while data is
//!   ready. "Not ready" ends the drain; it is the expected terminal case, not an error.
//! - End of file (all writers gone) and `EWOULDBLOCK` also end the drain.
//! - A failing `poll(2)` or `read(2)` is a [`PipeError`]; callers log it and treat the pipe as silent.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::errno::Errno;
use nix::libc;
use nix::poll::{PollFd, PollFlags, poll};
use thiserror::Error;

use crate::config::DEFAULT_POLL_TIMEOUT;

/// Bytes requested per `read(2)` while the pipe reports readable.
const READ_CHUNK: usize = 4096;

/// Errors from opening or draining a telemetry pipe.
#[derive(Debug, Error)]
pub enum PipeError {
    #[error("failed to open pipe {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("poll failed on pipe {}: {source}", path.display())]
    Poll {
        path: PathBuf,
        #[source]
        source: Errno,
    },

    #[error("read failed on pipe {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An open, non-blocking read handle on a named pipe.
///
/// The descriptor is closed when the handle is dropped.
#[derive(Debug)]
pub struct PipeHandle {
    path: PathBuf,
    file: File,
}

impl PipeHandle {
    /// Open `path` for non-blocking reads.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PipeError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| PipeError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Drains pipes with a bounded readiness wait.
#[derive(Debug, Clone, Copy)]
pub struct PipeReader {
    timeout: Duration,
}

impl Default for PipeReader {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_TIMEOUT)
    }
}

impl PipeReader {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Timeout in the unit `poll(2)` takes, clamped to what it can express.
    fn timeout_ms(&self) -> u16 {
        u16::try_from(self.timeout.as_millis()).unwrap_or(u16::MAX)
    }

    /// Read everything currently available on `handle`.
    ///
    /// Returns the bytes read, possibly empty. Returns within one readiness wait after the
    /// producer goes quiet.
    pub fn drain(&self, handle: &mut PipeHandle) -> Result<Vec<u8>, PipeError> {
        let mut data = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let readable = {
                let mut fds = [PollFd::new(handle.file.as_fd(), PollFlags::POLLIN)];
                match poll(&mut fds, self.timeout_ms()) {
                    Ok(0) => false,
                    Ok(_) => fds[0].revents().is_some_and(|ev| ev.contains(PollFlags::POLLIN)),
                    Err(Errno::EINTR) => continue,
                    Err(source) => {
                        return Err(PipeError::Poll {
                            path: handle.path.clone(),
                            source,
                        });
                    }
                }
            };
            if !readable {
                break;
            }

            match handle.file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => data.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(PipeError::Read {
                        path: handle.path.clone(),
                        source,
                    });
                }
            }
        }

        tracing::debug!(pipe = %handle.path.display(), bytes = data.len(), "drained telemetry pipe");
        Ok(data)
    }
}
