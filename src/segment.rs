use std::{fs::File, io};

use crate::LogSink;

/// The file currently receiving writes, plus its bookkeeping.
#[derive(Debug)]
pub struct Segment {
    bytes_written: u64,
    epoch: usize,
    file: Option<File>,
}
impl Segment {
    pub fn new(epoch: usize) -> Self {
        Self {
            bytes_written: 0,
            epoch,
            file: None,
        }
    }

    pub fn attach(&mut self, file: File, bytes_written: u64) {
        self.file = Some(file);
        self.bytes_written = bytes_written;
    }

    /// Closes the current file, if any, and moves on to the next epoch.
    pub fn detach(&mut self) -> Option<File> {
        self.bytes_written = 0;
        self.epoch = self.epoch.wrapping_add(1);
        self.file.take()
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(file) = &self.file else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "no open log file"));
        };
        let n = file.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match &self.file {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
