use std::{io, sync::Arc};

use crate::LogSink;

/// Broadcasts every write to a fixed, ordered set of sinks.
///
/// Each member gets the whole buffer even when an earlier one failed; the
/// first error is the one reported. Nothing is rolled back, so a failed write
/// may still have reached some members.
#[derive(Clone, Default)]
pub struct FanoutSink {
    members: Vec<Arc<dyn LogSink>>,
}
impl FanoutSink {
    pub fn new(members: Vec<Arc<dyn LogSink>>) -> Self {
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
impl LogSink for FanoutSink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        first_error(self.members.iter().map(|m| m.write_all(buf)))?;
        Ok(buf.len())
    }

    fn flush(&self) -> io::Result<()> {
        first_error(self.members.iter().map(|m| m.flush()))
    }
}
impl core::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FanoutSink")
            .field("members", &self.members.len())
            .finish()
    }
}

/// Drives every result to completion and keeps the first error.
fn first_error(results: impl Iterator<Item = io::Result<()>>) -> io::Result<()> {
    let mut first = None;
    for res in results {
        if let Err(e) = res {
            first.get_or_insert(e);
        }
    }
    match first {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use super::*;

    #[derive(Default)]
    struct VecSink {
        received: Mutex<Vec<u8>>,
        flushes: AtomicUsize,
    }
    impl VecSink {
        fn received(&self) -> Vec<u8> {
            self.received.lock().unwrap().clone()
        }
    }
    impl LogSink for VecSink {
        fn write(&self, buf: &[u8]) -> io::Result<usize> {
            self.received.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&self) -> io::Result<()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct BrokenSink {
        kind: io::ErrorKind,
    }
    impl LogSink for BrokenSink {
        fn write(&self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(self.kind, "broken"))
        }

        fn flush(&self) -> io::Result<()> {
            Err(io::Error::new(self.kind, "broken"))
        }
    }

    #[test]
    fn test_every_member_receives_everything_in_order() {
        let a = Arc::new(VecSink::default());
        let b = Arc::new(VecSink::default());
        let sink = FanoutSink::new(vec![a.clone(), b.clone()]);
        let mut expected = Vec::new();
        for record in ["one\n", "two\n", "three\n"] {
            assert_eq!(sink.write(record.as_bytes()).unwrap(), record.len());
            expected.extend_from_slice(record.as_bytes());
        }
        assert_eq!(a.received(), expected);
        assert_eq!(b.received(), expected);
    }

    #[test]
    fn test_empty_sink_accepts_everything() {
        let sink = FanoutSink::default();
        assert!(sink.is_empty());
        assert_eq!(sink.write(b"dropped").unwrap(), 7);
        assert_eq!(sink.write(b"").unwrap(), 0);
        sink.flush().unwrap();
    }

    #[test]
    fn test_failure_still_reaches_later_members() {
        let before = Arc::new(VecSink::default());
        let after = Arc::new(VecSink::default());
        let sink = FanoutSink::new(vec![
            before.clone(),
            Arc::new(BrokenSink {
                kind: io::ErrorKind::PermissionDenied,
            }),
            Arc::new(BrokenSink {
                kind: io::ErrorKind::Other,
            }),
            after.clone(),
        ]);
        assert_eq!(sink.len(), 4);
        let err = sink.write(b"record").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(before.received(), b"record");
        assert_eq!(after.received(), b"record");
    }

    #[test]
    fn test_flush_reaches_every_member() {
        let a = Arc::new(VecSink::default());
        let b = Arc::new(VecSink::default());
        let sink = FanoutSink::new(vec![
            a.clone(),
            Arc::new(BrokenSink {
                kind: io::ErrorKind::BrokenPipe,
            }),
            b.clone(),
        ]);
        let err = sink.flush().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(a.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(b.flushes.load(Ordering::SeqCst), 1);
    }
}
