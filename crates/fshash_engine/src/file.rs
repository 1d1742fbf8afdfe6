//! Platform file access for the hashing engine.
//!
//! All platform-specific open flags and read-ahead hints are confined to this
//! module. Files are opened read-only with a sequential-scan advisory: on
//! Linux `posix_fadvise(POSIX_FADV_SEQUENTIAL)` plus `O_NOATIME` (retried
//! without it on `EPERM`), on macOS `F_RDAHEAD`, on Windows
//! `FILE_FLAG_SEQUENTIAL_SCAN` at open time.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// A read-only file handle opened for sequential scanning.
pub struct FileHandle {
    file: File,
}

impl FileHandle {
    /// Opens `path` for reading and applies the platform's sequential-read
    /// advisory.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = open_sequential(path)?;
        Ok(FileHandle { file })
    }

    /// Reads up to `buf.len()` bytes. Returns 0 at EOF. Retries on
    /// signal interruption.
    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.file.read(buf) {
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn open_sequential(path: &Path) -> io::Result<File> {
    use std::os::fd::AsRawFd;
    use std::os::unix::fs::OpenOptionsExt;

    use nix::fcntl::{posix_fadvise, OFlag, PosixFadviseAdvice};

    // O_NOATIME skips atime metadata writes but needs file ownership or
    // CAP_FOWNER; retry without it on EPERM.
    let file = match File::options()
        .read(true)
        .custom_flags(OFlag::O_NOATIME.bits())
        .open(path)
    {
        Ok(file) => file,
        Err(ref e) if e.kind() == io::ErrorKind::PermissionDenied => File::open(path)?,
        Err(e) => return Err(e),
    };

    let _ = posix_fadvise(
        file.as_raw_fd(),
        0,
        0,
        PosixFadviseAdvice::POSIX_FADV_SEQUENTIAL,
    );
    Ok(file)
}

#[cfg(target_os = "macos")]
fn open_sequential(path: &Path) -> io::Result<File> {
    use std::os::fd::AsFd;

    use nix::fcntl::{fcntl, FcntlArg};

    let file = File::open(path)?;
    let _ = fcntl(file.as_fd(), FcntlArg::F_RDAHEAD(1));
    Ok(file)
}

#[cfg(all(unix, not(any(target_os = "linux", target_os = "macos"))))]
fn open_sequential(path: &Path) -> io::Result<File> {
    File::open(path)
}

#[cfg(windows)]
fn open_sequential(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;

    const FILE_FLAG_SEQUENTIAL_SCAN: u32 = 0x0800_0000;

    File::options()
        .read(true)
        .custom_flags(FILE_FLAG_SEQUENTIAL_SCAN)
        .open(path)
}

/// Interprets an encoded path segment as a filesystem path.
///
/// Returns `None` for empty segments, and on Windows for segments that are
/// not valid UTF-8 (std performs the UTF-16 conversion at the syscall
/// boundary).
pub fn path_from_segment(segment: &[u8]) -> Option<&Path> {
    if segment.is_empty() {
        return None;
    }
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Some(Path::new(std::ffi::OsStr::from_bytes(segment)))
    }
    #[cfg(not(unix))]
    {
        std::str::from_utf8(segment).ok().map(Path::new)
    }
}
