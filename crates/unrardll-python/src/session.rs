//! The session state owning one open archive and its native resources.

use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicI32;
use std::sync::atomic::Ordering;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use unrar_sys as ffi;

/// Sink selector value meaning "deliver data chunks to the callback object".
pub(crate) const CALLBACK_SINK: i32 = -1;

/// State shared between a session operation and the engine callback.
///
/// A pointer to this struct is registered as the engine's callback user
/// data, so its address must stay stable for the session's lifetime; it is
/// always held behind a `Box` for that reason. The callback runs on the
/// calling thread while the GIL is released, so the mutable pieces use
/// interior mutability.
#[derive(Debug)]
pub(crate) struct Operation {
    /// Address of the native engine handle. Zero until open completes, and
    /// never read again after release.
    pub(crate) handle: usize,
    /// Caller-supplied callback object, retained for the session lifetime.
    pub(crate) callback: Option<Py<PyAny>>,
    failure: Mutex<Option<String>>,
    output_fd: AtomicI32,
}

impl Operation {
    pub(crate) fn new(callback: Option<Py<PyAny>>) -> Box<Self> {
        Box::new(Self {
            handle: 0,
            callback,
            failure: Mutex::new(None),
            output_fd: AtomicI32::new(CALLBACK_SINK),
        })
    }

    fn failure_slot(&self) -> MutexGuard<'_, Option<String>> {
        // No code panics while holding this lock, but a poisoned failure
        // record is still better surfaced than dropped.
        match self.failure.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Records a callback failure for surfacing after the native call
    /// returns. The last recorded message wins.
    pub(crate) fn record_failure(&self, message: impl Into<String>) {
        *self.failure_slot() = Some(message.into());
    }

    /// Returns the most recently recorded callback failure, if any.
    pub(crate) fn last_failure(&self) -> Option<String> {
        self.failure_slot().clone()
    }

    /// Selects the sink for data chunks: a raw file descriptor, or
    /// [`CALLBACK_SINK`] to route them through the callback object.
    pub(crate) fn set_output_fd(&self, fd: i32) {
        self.output_fd.store(fd, Ordering::Release);
    }

    pub(crate) fn output_fd(&self) -> i32 {
        self.output_fd.load(Ordering::Acquire)
    }
}

impl Drop for Operation {
    fn drop(&mut self) {
        // The native handle is released first; the callback reference (a
        // struct field) is released by the drop glue right after. Both
        // happen exactly once no matter which exit path dropped us.
        if self.handle != 0 {
            unsafe { ffi::RARCloseArchive(self.handle as ffi::HANDLE) };
            self.handle = 0;
        }
    }
}

/// Handle to one open RAR archive.
///
/// Created by `open_archive` and released by `close_archive` (or garbage
/// collection). A session is not designed for concurrent use; callers must
/// serialize operations on it.
#[pyclass(name = "RARFileHandle", module = "unrar")]
pub struct RarFileHandle {
    op: Option<Box<Operation>>,
}

impl RarFileHandle {
    pub(crate) fn new(op: Box<Operation>) -> Self {
        Self { op: Some(op) }
    }

    /// Returns the live operation state, or an error if the session was
    /// already released.
    pub(crate) fn op(&self) -> PyResult<&Operation> {
        self.op
            .as_deref()
            .ok_or_else(|| PyValueError::new_err("I/O operation on a closed RAR archive"))
    }

    /// Releases the native handle and the retained callback reference.
    /// Idempotent: later calls find nothing to release.
    pub(crate) fn release(&mut self) {
        self.op = None;
    }
}

#[pymethods]
impl RarFileHandle {
    /// Closes the archive. Safe to call more than once.
    fn close(&mut self) {
        self.release();
    }

    fn __repr__(&self) -> String {
        if self.op.is_some() {
            "<RARFileHandle open>".to_owned()
        } else {
            "<RARFileHandle closed>".to_owned()
        }
    }
}
