//! Byte sources feeding the decoder.

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::errno::Errno;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::AsFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

/// Result of one fill attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// `n > 0` bytes were written to the front of the buffer.
    Bytes(usize),
    /// Nothing arrived within the source's wait bound.
    TimedOut,
    /// The stream is closed.
    Eof,
}

pub trait ByteSource {
    /// Read up to `buf.len()` bytes, waiting at most the source's bound.
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<Fill>;
}

/// Terminal input read through a duplicated stdin descriptor.
///
/// Each fill waits at most `timeout_ms` for readiness, so a caller looping on
/// [`Fill::TimedOut`] regains control periodically. A signal landing during
/// the wait is reported as a timeout; when the SIGINT flag from
/// [`crate::signal::install_interrupt_catch`] is set it is consumed and
/// otherwise ignored.
pub struct TtySource {
    file: File,
    timeout_ms: u16,
    interrupted: Option<Arc<AtomicBool>>,
}

impl TtySource {
    pub fn stdin(timeout_ms: u16) -> io::Result<Self> {
        let fd = io::stdin().as_fd().try_clone_to_owned()?;
        Ok(Self {
            file: File::from(fd),
            timeout_ms,
            interrupted: None,
        })
    }

    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(flag);
        self
    }

    fn drain_interrupt(&self) {
        if let Some(flag) = &self.interrupted
            && flag.swap(false, Ordering::SeqCst)
        {
            trace!(target: "input.signal", "interrupt_ignored");
        }
    }
}

impl ByteSource for TtySource {
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<Fill> {
        let ready = {
            let mut fds = [PollFd::new(self.file.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::from(self.timeout_ms)) {
                Ok(0) => None,
                Ok(_) => fds[0].revents(),
                Err(Errno::EINTR) => {
                    self.drain_interrupt();
                    return Ok(Fill::TimedOut);
                }
                Err(err) => return Err(err.into()),
            }
        };
        self.drain_interrupt();
        let Some(revents) = ready else {
            return Ok(Fill::TimedOut);
        };
        if !revents.contains(PollFlags::POLLIN) {
            if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR | PollFlags::POLLNVAL) {
                return Ok(Fill::Eof);
            }
            return Ok(Fill::TimedOut);
        }
        match (&self.file).read(buf) {
            Ok(0) => Ok(Fill::Eof),
            Ok(n) => Ok(Fill::Bytes(n)),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => Ok(Fill::TimedOut),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(Fill::TimedOut),
            Err(err) => Err(err),
        }
    }
}

/// In-memory source, optionally handing out at most `chunk` bytes per fill.
#[derive(Debug, Clone)]
pub struct SliceSource {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl SliceSource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            chunk: usize::MAX,
        }
    }

    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk.max(1);
        self
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl ByteSource for SliceSource {
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<Fill> {
        let n = self.remaining().min(buf.len()).min(self.chunk);
        if n == 0 {
            return Ok(Fill::Eof);
        }
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(Fill::Bytes(n))
    }
}
