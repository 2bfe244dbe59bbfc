//! Whole-file OS locks.
//!
//! Read locks are shared, write locks exclusive, and the lock always
//! covers the entire file. Acquisition may suspend until the holder
//! releases. The guard unlocks on drop.

use std::fs::File;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Shared,
    Exclusive,
}

/// Holds the OS lock for the guard's lifetime.
pub struct FileLockGuard<'a> {
    file: &'a File,
}

impl Drop for FileLockGuard<'_> {
    fn drop(&mut self) {
        let _ = unlock(self.file);
    }
}

/// Acquire a whole-file lock, blocking until available.
pub fn lock_file(file: &File, kind: LockKind) -> io::Result<FileLockGuard<'_>> {
    platform_lock(file, kind)?;
    Ok(FileLockGuard { file })
}

#[cfg(unix)]
fn platform_lock(file: &File, kind: LockKind) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let op = match kind {
        LockKind::Shared => libc::LOCK_SH,
        LockKind::Exclusive => libc::LOCK_EX,
    };
    loop {
        let rc = unsafe { libc::flock(file.as_raw_fd(), op) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(unix)]
fn unlock(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(windows)]
fn platform_lock(file: &File, kind: LockKind) -> io::Result<()> {
    use std::os::windows::io::AsRawHandle;
    use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LockFileEx};
    use windows_sys::Win32::System::IO::OVERLAPPED;

    let flags = match kind {
        LockKind::Shared => 0,
        LockKind::Exclusive => LOCKFILE_EXCLUSIVE_LOCK,
    };
    let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
    let ok = unsafe {
        LockFileEx(
            file.as_raw_handle() as _,
            flags,
            0,
            !0,
            !0,
            &mut overlapped,
        )
    };
    if ok != 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(windows)]
fn unlock(file: &File) -> io::Result<()> {
    use std::os::windows::io::AsRawHandle;
    use windows_sys::Win32::Storage::FileSystem::UnlockFileEx;
    use windows_sys::Win32::System::IO::OVERLAPPED;

    let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
    let ok = unsafe { UnlockFileEx(file.as_raw_handle() as _, 0, !0, !0, &mut overlapped) };
    if ok != 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_and_release() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = tmp.reopen().unwrap();
        {
            let _guard = lock_file(&file, LockKind::Exclusive).unwrap();
        }
        // Released on drop; relockable.
        let _guard = lock_file(&file, LockKind::Shared).unwrap();
    }

    #[test]
    fn shared_locks_coexist() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let f1 = tmp.reopen().unwrap();
        let f2 = tmp.reopen().unwrap();
        let _g1 = lock_file(&f1, LockKind::Shared).unwrap();
        let _g2 = lock_file(&f2, LockKind::Shared).unwrap();
    }
}
