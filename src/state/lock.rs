use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{EnforcementError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Exclusive advisory lock on a `.lock` sibling file, released on drop.
#[derive(Debug)]
pub struct FileLock {
    file: File,
}

impl FileLock {
    /// Poll for the lock until `wait` elapses.
    pub fn acquire(path: &Path, wait: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EnforcementError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| EnforcementError::io(path, e))?;

        let started = Instant::now();
        loop {
            match try_flock_exclusive(&file) {
                Ok(true) => return Ok(Self { file }),
                Ok(false) if started.elapsed() < wait => thread::sleep(POLL_INTERVAL),
                Ok(false) => {
                    return Err(EnforcementError::Lock {
                        path: path.to_path_buf(),
                        waited_ms: started.elapsed().as_millis() as u64,
                    })
                }
                Err(e) => return Err(EnforcementError::io(path, e)),
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        unlock(&self.file);
    }
}

/// `Ok(false)` when another process holds the lock.
fn try_flock_exclusive(file: &File) -> io::Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let fd = file.as_raw_fd();
        // SAFETY: fd is a valid descriptor owned by `file` for the whole call.
        let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
        if result == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK) {
            return Ok(false);
        }
        Err(err)
    }
    #[cfg(not(unix))]
    {
        let _ = file;
        tracing::warn!("advisory locking unsupported on this platform; proceeding unlocked");
        Ok(true)
    }
}

fn unlock(file: &File) {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: fd is a valid descriptor owned by `file`.
        unsafe {
            libc::flock(file.as_raw_fd(), libc::LOCK_UN);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = file;
    }
}
