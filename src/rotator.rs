use std::{
    ffi::OsString,
    fs::File,
    io,
    num::{NonZeroU64, NonZeroUsize},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{segment::Segment, LogSink, RotatingSink};

/// A log file at a fixed path whose contents get archived on rotation.
///
/// The active file always lives at [`FileRotator::path`]. Rotating renames it
/// to a numbered backup next to it (`app.log` -> `app.<epoch>.log`) and starts
/// a fresh file in its place. The next epoch is persisted in a sidecar
/// `<file name>.epoch` file so numbering continues across restarts.
#[derive(Debug)]
pub struct FileRotator {
    path: PathBuf,
    segment: Mutex<Segment>,
    rotation: RotationPolicy,
}
impl FileRotator {
    pub fn new(path: impl Into<PathBuf>, rotation: RotationPolicy) -> io::Result<Self> {
        let path = path.into();
        if path.file_name().is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "log file path has no file name",
            ));
        }
        if let Some(parent) = parent_dir(&path) {
            std::fs::create_dir_all(parent)?;
        }
        let persisted = cur_epoch(&path)?.unwrap_or_default();
        let epoch = persisted.max(next_unused_epoch(&path)?);
        let mut segment = Segment::new(epoch);
        open_existing_or_new(&path, &mut segment)?;

        Ok(Self {
            path,
            segment: Mutex::new(segment),
            rotation,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.rotation
    }

    /// Where the file archived at `epoch` ends up.
    pub fn backup_path(&self, epoch: usize) -> PathBuf {
        backup_path(&self.path, epoch)
    }

    /// Epoch the active file will be archived under.
    pub fn epoch(&self) -> usize {
        self.segment().epoch()
    }

    fn segment(&self) -> MutexGuard<'_, Segment> {
        self.segment.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rotate_locked(&self, segment: &mut Segment) -> io::Result<()> {
        let archived = segment.epoch();
        if let Some(file) = segment.detach() {
            file.flush()?;
        }
        if self.path.exists() {
            std::fs::rename(&self.path, backup_path(&self.path, archived))?;
        }
        write_epoch(&self.path, segment.epoch())?;
        if let Some(max_backups) = self.rotation.max_backups {
            delete_old_backup(&self.path, archived, max_backups.get())?;
        }
        open_new(&self.path, segment)
    }
}
impl LogSink for FileRotator {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut segment = self.segment();
        if let Some(max_bytes) = self.rotation.max_bytes {
            let len = buf.len() as u64;
            if len > max_bytes.get() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("write of {len} bytes exceeds the {max_bytes}-byte file cap"),
                ));
            }
            if max_bytes.get() < segment.bytes_written() + len {
                self.rotate_locked(&mut segment)?;
            }
        }
        if !segment.is_open() {
            open_existing_or_new(&self.path, &mut segment)?;
        }
        segment.write(buf)
    }

    fn flush(&self) -> io::Result<()> {
        self.segment().flush()
    }
}
impl RotatingSink for FileRotator {
    fn rotate(&self) -> io::Result<()> {
        let mut segment = self.segment();
        self.rotate_locked(&mut segment)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotate before a write would grow the active file past this size.
    pub max_bytes: Option<NonZeroU64>,
    /// Number of backups to keep; `None` keeps all of them.
    pub max_backups: Option<NonZeroUsize>,
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

fn open_existing_or_new(path: &Path, segment: &mut Segment) -> io::Result<()> {
    let file = File::options().create(true).append(true).open(path)?;
    let len = file.metadata()?.len();
    segment.attach(file, len);
    Ok(())
}

fn open_new(path: &Path, segment: &mut Segment) -> io::Result<()> {
    let file = File::options()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    segment.attach(file, 0);
    Ok(())
}

fn delete_old_backup(path: &Path, archived: usize, max_backups: usize) -> io::Result<()> {
    let del_epoch = archived.wrapping_sub(max_backups);
    let del_path = backup_path(path, del_epoch);
    match std::fs::remove_file(del_path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn write_epoch(path: &Path, epoch: usize) -> io::Result<()> {
    std::fs::write(epoch_file_path(path), epoch.to_string())
}

fn cur_epoch(path: &Path) -> io::Result<Option<usize>> {
    let epoch_path = epoch_file_path(path);
    let epoch = match std::fs::read_to_string(&epoch_path) {
        Ok(epoch) => epoch,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let epoch: usize = match epoch.trim().parse() {
        Ok(epoch) => epoch,
        Err(_) => {
            std::fs::remove_file(&epoch_path)?;
            return Ok(None);
        }
    };
    Ok(Some(epoch))
}

/// One past the highest `<stem>.<n>.<ext>` backup already on disk.
fn next_unused_epoch(path: &Path) -> io::Result<usize> {
    let dir = parent_dir(path).unwrap_or(Path::new("."));
    let (Some(stem), extension) = (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|e| e.to_str()),
    ) else {
        return Ok(0);
    };
    let prefix = format!("{stem}.");
    let suffix = extension.map(|e| format!(".{e}")).unwrap_or_default();
    let mut next = 0;
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name();
        let Some(epoch) = name
            .to_str()
            .and_then(|n| n.strip_prefix(&prefix))
            .and_then(|n| n.strip_suffix(&suffix))
            .and_then(|n| n.parse::<usize>().ok())
        else {
            continue;
        };
        next = next.max(epoch.wrapping_add(1));
    }
    Ok(next)
}

fn epoch_file_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".epoch");
    path.with_file_name(name)
}

fn backup_path(path: &Path, epoch: usize) -> PathBuf {
    let stem = path.file_stem().map(OsString::from).unwrap_or_default();
    let mut name = stem;
    name.push(".");
    name.push(epoch.to_string());
    if let Some(extension) = path.extension() {
        name.push(".");
        name.push(extension);
    }
    path.with_file_name(name)
}
