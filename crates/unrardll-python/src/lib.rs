//! Python bindings for streaming RAR extraction through the unrar library.
//!
//! The module exposes four operations (`open_archive`, `read_next_header`,
//! `process_file`, `close_archive`) that drive one extraction session
//! against the native unrar engine. Every native call may block for an
//! arbitrary time and may re-enter Python through the registered callback
//! object, so the GIL is released around each call and re-acquired only
//! inside callback bodies (see [`callback`]).

use std::ffi::c_uint;

use libc::wchar_t;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyBytes;
use unrar_sys as ffi;
use unrardll_core::MAX_COMMENT_SIZE;
use unrardll_core::PATH_BUFFER_CAPACITY;
use unrardll_core::RarStatus;
use unrardll_core::wide;

mod callback;
mod error;
mod header;
mod session;

use error::UNRARError;
use header::RarHeader;
use session::Operation;
use session::RarFileHandle;

/// Converts a `str` or `os.PathLike` argument to a Rust string.
///
/// Paths containing null bytes are rejected up front; they would silently
/// truncate once handed to the engine as a wide C string.
fn path_to_string(py: Python<'_>, path: &Bound<'_, PyAny>) -> PyResult<String> {
    let path_str: String = if let Ok(s) = path.extract::<String>() {
        s
    } else {
        let os = py.import("os")?;
        os.getattr("fspath")?.call1((path,))?.extract()?
    };
    if path_str.contains('\0') {
        return Err(PyValueError::new_err("archive path contains null bytes"));
    }
    Ok(path_str)
}

/// Opens the RAR archive at `path` and returns a session handle.
///
/// `callback`, if given, must expose `_get_password()` and
/// `_process_data(bytes)`; it is retained for the session's lifetime. With
/// `get_comment=True` the return value is a `(handle, comment_bytes)` pair,
/// the comment truncated by the engine at 512 KiB.
#[pyfunction]
#[pyo3(signature = (path, callback=None, mode=ffi::RAR_OM_LIST, get_comment=false))]
fn open_archive(
    py: Python<'_>,
    path: &Bound<'_, PyAny>,
    callback: Option<Py<PyAny>>,
    mode: u32,
    get_comment: bool,
) -> PyResult<Py<PyAny>> {
    let path = path_to_string(py, path)?;
    let mut path_buf = vec![0 as wchar_t; PATH_BUFFER_CAPACITY];
    wide::encode_wide(&path, &mut path_buf)
        .map_err(|err| error::wide_to_py(err, "invalid archive path"))?;

    let mut comment_buf = if get_comment {
        vec![0u8; MAX_COMMENT_SIZE]
    } else {
        Vec::new()
    };

    let mut op = Operation::new(callback);
    let mut open_data = ffi::RAROpenArchiveDataEx::zeroed();
    open_data.ArcNameW = path_buf.as_mut_ptr();
    open_data.OpenMode = mode;
    open_data.Callback = Some(callback::unrar_callback);
    open_data.UserData = std::ptr::from_ref::<Operation>(&op) as ffi::LPARAM;
    if get_comment {
        open_data.CmtBuf = comment_buf.as_mut_ptr().cast();
        #[allow(clippy::cast_possible_truncation)]
        {
            open_data.CmtBufSize = MAX_COMMENT_SIZE as c_uint;
        }
    }

    // The open call may scan volumes and ask for passwords; it runs without
    // the GIL so other Python threads can make progress.
    let data_addr = std::ptr::from_mut(&mut open_data) as usize;
    let handle = py
        .detach(move || unsafe { ffi::RAROpenArchiveEx(data_addr as *mut ffi::RAROpenArchiveDataEx) as usize });

    let mut status = RarStatus::from_code(open_data.OpenResult);
    if handle == 0 && status.is_success() {
        status = RarStatus::Unknown;
    }
    if !status.is_success() {
        if handle != 0 {
            unsafe { ffi::RARCloseArchive(handle as ffi::HANDLE) };
        }
        // `op` still carries no handle, so dropping it here releases only
        // the callback reference.
        return Err(error::status_to_py(status));
    }

    op.handle = handle;
    let archive = Py::new(py, RarFileHandle::new(op))?;
    if get_comment {
        let reported = (open_data.CmtSize as usize).min(MAX_COMMENT_SIZE);
        // The engine terminates the comment with a NUL that is not part of it.
        let comment = PyBytes::new(py, &comment_buf[..reported.saturating_sub(1)]);
        let pair = (archive, comment).into_pyobject(py)?;
        return Ok(pair.into_any().unbind());
    }
    Ok(archive.into_any())
}

/// Reads the next entry header from the archive.
///
/// Returns `None` once the end of the archive is reached.
#[pyfunction]
fn read_next_header(
    py: Python<'_>,
    archive: &Bound<'_, RarFileHandle>,
) -> PyResult<Option<RarHeader>> {
    let handle = archive.try_borrow()?.op()?.handle;

    let mut redir_buf = vec![0 as wchar_t; header::REDIR_NAME_CAPACITY];
    let mut raw = ffi::RARHeaderDataEx::zeroed();
    raw.RedirName = redir_buf.as_mut_ptr();
    #[allow(clippy::cast_possible_truncation)]
    {
        raw.RedirNameSize = header::REDIR_NAME_CAPACITY as c_uint;
    }

    let raw_addr = std::ptr::from_mut(&mut raw) as usize;
    let code = py.detach(move || unsafe {
        ffi::RARReadHeaderEx(handle as ffi::HANDLE, raw_addr as *mut ffi::RARHeaderDataEx)
    });

    #[allow(clippy::cast_sign_loss)]
    let status = RarStatus::from_code(code as u32);
    match status {
        RarStatus::EndArchive => Ok(None),
        RarStatus::Success => Ok(Some(RarHeader::from_raw(&raw, &redir_buf))),
        status => Err(error::status_to_py(status)),
    }
}

/// Processes the entry whose header was just read.
///
/// `operation` is one of `RAR_SKIP`, `RAR_TEST` (default) or `RAR_EXTRACT`.
/// When `output_fd` names a writable descriptor, decoded bytes are written
/// straight to it; otherwise they go through the callback object's
/// `_process_data`. A failure recorded by the callback during the call is
/// preferred over the engine's generic `ERAR_UNKNOWN` status.
#[pyfunction]
#[pyo3(signature = (archive, operation = ffi::RAR_TEST, output_fd = None))]
fn process_file(
    py: Python<'_>,
    archive: &Bound<'_, RarFileHandle>,
    operation: i32,
    output_fd: Option<i32>,
) -> PyResult<()> {
    let handle = {
        let guard = archive.try_borrow()?;
        let op = guard.op()?;
        op.set_output_fd(output_fd.unwrap_or(session::CALLBACK_SINK));
        op.handle
    };

    let code = py.detach(move || unsafe {
        ffi::RARProcessFile(
            handle as ffi::HANDLE,
            operation,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
        )
    });

    #[allow(clippy::cast_sign_loss)]
    let status = RarStatus::from_code(code as u32);
    match status {
        RarStatus::Success => Ok(()),
        RarStatus::Unknown => {
            let failure = archive
                .try_borrow()?
                .op()
                .ok()
                .and_then(|op| op.last_failure());
            match failure {
                Some(message) => Err(UNRARError::new_err(message)),
                None => Err(error::status_to_py(RarStatus::Unknown)),
            }
        }
        status => Err(error::status_to_py(status)),
    }
}

/// Closes the archive, releasing the native handle and the retained
/// callback reference. Closing an already-closed handle is a no-op.
#[pyfunction]
fn close_archive(archive: &Bound<'_, RarFileHandle>) -> PyResult<()> {
    archive.try_borrow_mut()?.release();
    Ok(())
}

/// Python module definition.
#[pymodule]
fn unrar(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add(
        "__doc__",
        "Streaming RAR extraction sessions backed by the unrar library",
    )?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    m.add_function(wrap_pyfunction!(open_archive, m)?)?;
    m.add_function(wrap_pyfunction!(close_archive, m)?)?;
    m.add_function(wrap_pyfunction!(read_next_header, m)?)?;
    m.add_function(wrap_pyfunction!(process_file, m)?)?;

    m.add_class::<RarFileHandle>()?;
    m.add_class::<RarHeader>()?;

    error::register_exceptions(m)?;

    m.add("RARDllVersion", unsafe { ffi::RARGetDllVersion() })?;

    m.add("RAR_OM_LIST", ffi::RAR_OM_LIST)?;
    m.add("RAR_OM_EXTRACT", ffi::RAR_OM_EXTRACT)?;
    m.add("RAR_OM_LIST_INCSPLIT", ffi::RAR_OM_LIST_INCSPLIT)?;
    m.add("RAR_SKIP", ffi::RAR_SKIP)?;
    m.add("RAR_TEST", ffi::RAR_TEST)?;
    m.add("RAR_EXTRACT", ffi::RAR_EXTRACT)?;

    Ok(())
}
