//! Marshaling of per-entry headers into Python-visible records.

use libc::wchar_t;
use pyo3::prelude::*;
use unrar_sys as ffi;
use unrardll_core::combine;
use unrardll_core::wide;

/// Capacity, in wide characters, of the redirect-name buffer supplied to
/// every header read. RAR5 link targets share the engine's 1024-unit name
/// limit.
pub(crate) const REDIR_NAME_CAPACITY: usize = 1024;

/// One archive entry header, produced fresh by each `read_next_header`
/// call and not retained by the session.
#[pyclass(name = "RarHeader", module = "unrar", frozen)]
pub struct RarHeader {
    /// Entry file name.
    #[pyo3(get)]
    filename: String,
    /// Raw header flag bits.
    #[pyo3(get)]
    flags: u32,
    /// Packed size in bytes, reconstructed from the high/low pair.
    #[pyo3(get)]
    pack_size: u64,
    /// Unpacked size in bytes, reconstructed from the high/low pair.
    #[pyo3(get)]
    unpack_size: u64,
    /// Host operating system tag.
    #[pyo3(get)]
    host_os: u32,
    /// CRC of the unpacked data.
    #[pyo3(get)]
    file_crc: u32,
    /// DOS-format modification timestamp.
    #[pyo3(get)]
    file_time: u32,
    /// Minimum engine version needed to decode this entry.
    #[pyo3(get)]
    unpack_ver: u32,
    /// Decode-method tag.
    #[pyo3(get)]
    method: u32,
    /// Platform file attributes.
    #[pyo3(get)]
    file_attr: u32,
    /// Whether this entry is a directory.
    #[pyo3(get)]
    is_dir: bool,
    /// Redirect kind (0 = none, 1 = unix symlink, ...).
    #[pyo3(get)]
    redir_type: u32,
    /// Redirect target, present only when the entry is a redirect with a
    /// non-empty target name.
    #[pyo3(get)]
    redir_name: Option<String>,
}

impl RarHeader {
    /// Builds a header record from the engine's raw struct and the
    /// redirect-name buffer that was registered for the read.
    pub(crate) fn from_raw(raw: &ffi::RARHeaderDataEx, redir_buf: &[wchar_t]) -> Self {
        let filename = wide::decode_wide(wide::nul_terminated(&raw.FileNameW));
        let redir_name = if raw.RedirType == 0 {
            None
        } else {
            let target = wide::nul_terminated(redir_buf);
            if target.is_empty() {
                None
            } else {
                Some(wide::decode_wide(target))
            }
        };
        Self {
            filename,
            flags: raw.Flags,
            pack_size: combine(raw.PackSizeHigh, raw.PackSize),
            unpack_size: combine(raw.UnpSizeHigh, raw.UnpSize),
            host_os: raw.HostOS,
            file_crc: raw.FileCRC,
            file_time: raw.FileTime,
            unpack_ver: raw.UnpVer,
            method: raw.Method,
            file_attr: raw.FileAttr,
            is_dir: raw.Flags & ffi::RHDF_DIRECTORY != 0,
            redir_type: raw.RedirType,
            redir_name,
        }
    }
}

#[pymethods]
impl RarHeader {
    fn __repr__(&self) -> String {
        format!(
            "RarHeader(filename={:?}, unpack_size={}, pack_size={}, is_dir={})",
            self.filename,
            self.unpack_size,
            self.pack_size,
            if self.is_dir { "True" } else { "False" }
        )
    }
}
