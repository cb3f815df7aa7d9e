//! Direct file-descriptor sink for decoded data chunks.

use std::io;
use std::os::unix::io::RawFd;

#[cfg(any(target_os = "linux", target_os = "android"))]
fn clear_errno() {
    unsafe { *libc::__errno_location() = 0 };
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
fn clear_errno() {
    unsafe { *libc::__error() = 0 };
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd"
)))]
fn clear_errno() {}

/// Writes the whole buffer to `fd`, looping over partial writes.
///
/// Interrupted and would-block conditions are retried without reducing the
/// remaining count. A zero-byte write accompanied by a system error is
/// fatal, as is any other write failure.
pub fn write_all(fd: RawFd, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        clear_errno();
        let written = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
        if written < 0 {
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR | libc::EAGAIN) => continue,
                #[allow(unreachable_patterns)] // EAGAIN == EWOULDBLOCK on most targets
                Some(libc::EWOULDBLOCK) => continue,
                _ => return Err(err),
            }
        }
        if written == 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error().unwrap_or(0) != 0 {
                return Err(err);
            }
            continue;
        }
        #[allow(clippy::cast_sign_loss)]
        let written = written as usize;
        buf = &buf[written..];
    }
    Ok(())
}
