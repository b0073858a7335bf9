use std::{
    io::{self, Write},
    sync::Arc,
};

pub mod config;
mod error;
pub mod fanout;
pub mod logger;
pub mod rotator;
mod segment;
pub mod timed;
pub mod window;

pub use error::{Error, Result};

/// A byte sink that can be shared between threads.
///
/// Mirrors [`std::io::Write`] but takes `&self`, so a single sink can sit
/// behind an `Arc` and receive writes from any number of callers.
pub trait LogSink: Send + Sync {
    fn write(&self, buf: &[u8]) -> io::Result<usize>;
    fn flush(&self) -> io::Result<()>;

    fn write_all(&self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole buffer",
                    ));
                }
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// A sink whose target can be swapped for a fresh one.
pub trait RotatingSink: LogSink {
    /// Closes the current target and opens a new one for subsequent writes.
    fn rotate(&self) -> io::Result<()>;
}

impl LogSink for std::fs::File {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut file: &std::fs::File = self;
        Write::write(&mut file, buf)
    }

    fn flush(&self) -> io::Result<()> {
        let mut file: &std::fs::File = self;
        Write::flush(&mut file)
    }
}

impl LogSink for io::Stderr {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut stderr: &io::Stderr = self;
        Write::write(&mut stderr, buf)
    }

    fn flush(&self) -> io::Result<()> {
        let mut stderr: &io::Stderr = self;
        Write::flush(&mut stderr)
    }
}

impl LogSink for io::Stdout {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut stdout: &io::Stdout = self;
        Write::write(&mut stdout, buf)
    }

    fn flush(&self) -> io::Result<()> {
        let mut stdout: &io::Stdout = self;
        Write::flush(&mut stdout)
    }
}

impl<S> LogSink for Arc<S>
where
    S: LogSink + ?Sized,
{
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn flush(&self) -> io::Result<()> {
        (**self).flush()
    }
}

impl<S> LogSink for Box<S>
where
    S: LogSink + ?Sized,
{
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn flush(&self) -> io::Result<()> {
        (**self).flush()
    }
}

impl<S> RotatingSink for Arc<S>
where
    S: RotatingSink + ?Sized,
{
    fn rotate(&self) -> io::Result<()> {
        (**self).rotate()
    }
}
