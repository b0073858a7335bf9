//! The process-wide log handle
//!
//! [`Logger`] owns the sink chain built from a [`LogConfig`] and plugs it into
//! `tracing-subscriber` as a [`MakeWriter`]. It is an ordinary value: build it
//! once at startup and pass clones to whatever needs to log or flush.

use std::{
    fs::File,
    io::{self, Write},
    sync::Arc,
};

use tracing_subscriber::fmt::MakeWriter;

use crate::{
    config::LogConfig, fanout::FanoutSink, rotator::FileRotator, timed::TimedRotatingWriter,
    Error, LogSink, Result,
};

#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
}
impl Logger {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Builds the sink chain described by `config`:
    ///
    /// - no `file_path`: stderr only
    /// - `file_path` with `enable_dual_sink`: stderr and the file
    /// - `file_path` without it: the file only
    ///
    /// The file is wrapped in a [`TimedRotatingWriter`] when `rotate` is set.
    pub fn from_config(config: &LogConfig) -> Result<Self> {
        config.validate()?;
        let stderr: Arc<dyn LogSink> = Arc::new(io::stderr());
        let Some(path) = &config.file_path else {
            return Ok(Self::new(stderr));
        };

        let file: Arc<dyn LogSink> = if config.rotate {
            let rotator =
                FileRotator::new(path.clone(), config.rotation_policy()).map_err(|source| {
                    Error::Open {
                        path: path.clone(),
                        source,
                    }
                })?;
            Arc::new(TimedRotatingWriter::new(
                rotator,
                config.rotation_interval,
            )?)
        } else {
            Arc::new(open_append(path).map_err(|source| Error::Open {
                path: path.clone(),
                source,
            })?)
        };

        let sink: Arc<dyn LogSink> = if config.enable_dual_sink {
            Arc::new(FanoutSink::new(vec![stderr, file]))
        } else {
            file
        };
        Ok(Self::new(sink))
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    pub fn flush(&self) -> io::Result<()> {
        self.sink.flush()
    }

    /// A `tracing` subscriber that formats events as plain text and writes
    /// them through this logger.
    pub fn subscriber(
        &self,
        level: impl Into<tracing::Level>,
    ) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(level.into())
            .with_writer(self.clone())
            .finish()
    }

    /// Installs [`Self::subscriber`] as the global default.
    pub fn init(&self, level: impl Into<tracing::Level>) -> Result<()> {
        tracing::subscriber::set_global_default(self.subscriber(level))?;
        Ok(())
    }

    /// Logs `message` at error level, flushes, and exits with status 1.
    ///
    /// The record goes through this logger whether or not [`Self::init`] was
    /// called.
    pub fn fatal(&self, message: &str) -> ! {
        if let Err(e) = self.log_fatal(message) {
            eprintln!("failed to flush log sink: {e}");
        }
        std::process::exit(1)
    }

    fn log_fatal(&self, message: &str) -> io::Result<()> {
        let dispatch = tracing::Dispatch::new(self.subscriber(tracing::Level::ERROR));
        tracing::dispatcher::with_default(&dispatch, || tracing::error!("{message}"));
        self.flush()
    }
}
impl core::fmt::Debug for Logger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

impl<'a> MakeWriter<'a> for Logger {
    type Writer = SinkWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter::new(&*self.sink)
    }
}

/// [`io::Write`] adapter over a borrowed [`LogSink`].
pub struct SinkWriter<'a> {
    sink: &'a dyn LogSink,
}
impl<'a> SinkWriter<'a> {
    pub fn new(sink: &'a dyn LogSink) -> Self {
        Self { sink }
    }
}
impl Write for SinkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

fn open_append(path: &std::path::Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    File::options().create(true).append(true).open(path)
}
