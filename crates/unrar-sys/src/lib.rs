//! Raw FFI bindings to the unrar decoding library (`dll.hpp`).
//!
//! Everything here mirrors the C surface one to one; no safety layer is
//! provided. Use the `unrardll-python` crate for a usable API.
//!
//! The unrar callback protocol is synchronous: the engine may invoke the
//! registered [`UNRARCALLBACK`] re-entrantly on the calling thread from
//! inside [`RAROpenArchiveEx`], [`RARReadHeaderEx`] and [`RARProcessFile`].

#![allow(non_snake_case)]

use std::ffi::c_char;
use std::ffi::c_int;
use std::ffi::c_uchar;
use std::ffi::c_uint;
use std::ffi::c_void;

pub use libc::wchar_t;

/// Opaque archive handle returned by [`RAROpenArchiveEx`].
pub type HANDLE = *mut c_void;

/// The engine's pointer-sized callback parameter type (`LPARAM` / `LONG_PTR`).
pub type LPARAM = isize;

/// Callback registered through [`RAROpenArchiveDataEx::Callback`].
///
/// Returns `0` to continue the current operation, a negative value to abort.
pub type UNRARCALLBACK =
    Option<unsafe extern "system" fn(msg: c_uint, UserData: LPARAM, P1: LPARAM, P2: LPARAM) -> c_int>;

// Status codes returned by the engine.
pub const ERAR_SUCCESS: c_uint = 0;
pub const ERAR_END_ARCHIVE: c_uint = 10;
pub const ERAR_NO_MEMORY: c_uint = 11;
pub const ERAR_BAD_DATA: c_uint = 12;
pub const ERAR_BAD_ARCHIVE: c_uint = 13;
pub const ERAR_UNKNOWN_FORMAT: c_uint = 14;
pub const ERAR_EOPEN: c_uint = 15;
pub const ERAR_ECREATE: c_uint = 16;
pub const ERAR_ECLOSE: c_uint = 17;
pub const ERAR_EREAD: c_uint = 18;
pub const ERAR_EWRITE: c_uint = 19;
pub const ERAR_SMALL_BUF: c_uint = 20;
pub const ERAR_UNKNOWN: c_uint = 21;
pub const ERAR_MISSING_PASSWORD: c_uint = 22;
pub const ERAR_EREFERENCE: c_uint = 23;
pub const ERAR_BAD_PASSWORD: c_uint = 24;

// Open modes for RAROpenArchiveDataEx::OpenMode.
pub const RAR_OM_LIST: c_uint = 0;
pub const RAR_OM_EXTRACT: c_uint = 1;
pub const RAR_OM_LIST_INCSPLIT: c_uint = 2;

// Operations for RARProcessFile.
pub const RAR_SKIP: c_int = 0;
pub const RAR_TEST: c_int = 1;
pub const RAR_EXTRACT: c_int = 2;

// Volume-change callback outcomes (P2 of UCM_CHANGEVOLUME*).
pub const RAR_VOL_ASK: LPARAM = 0;
pub const RAR_VOL_NOTIFY: LPARAM = 1;

// Callback message classes.
pub const UCM_CHANGEVOLUME: c_uint = 0;
pub const UCM_PROCESSDATA: c_uint = 1;
pub const UCM_NEEDPASSWORD: c_uint = 2;
pub const UCM_CHANGEVOLUMEW: c_uint = 3;
pub const UCM_NEEDPASSWORDW: c_uint = 4;

// RARHeaderDataEx::Flags bits.
pub const RHDF_SPLITBEFORE: c_uint = 0x01;
pub const RHDF_SPLITAFTER: c_uint = 0x02;
pub const RHDF_ENCRYPTED: c_uint = 0x04;
pub const RHDF_SOLID: c_uint = 0x10;
pub const RHDF_DIRECTORY: c_uint = 0x20;

/// Archive open parameters and results (`RAROpenArchiveDataEx`).
#[repr(C)]
pub struct RAROpenArchiveDataEx {
    pub ArcName: *mut c_char,
    pub ArcNameW: *mut wchar_t,
    pub OpenMode: c_uint,
    pub OpenResult: c_uint,
    pub CmtBuf: *mut c_char,
    pub CmtBufSize: c_uint,
    pub CmtSize: c_uint,
    pub CmtState: c_uint,
    pub Flags: c_uint,
    pub Callback: UNRARCALLBACK,
    pub UserData: LPARAM,
    pub OpFlags: c_uint,
    pub CmtBufW: *mut wchar_t,
    pub Reserved: [c_uint; 25],
}

impl RAROpenArchiveDataEx {
    /// Returns a fully zeroed struct, the initialization state the engine
    /// expects before the caller fills in its fields.
    #[must_use]
    pub fn zeroed() -> Self {
        // Zero is valid for every field: null pointers, zero scalars and a
        // None callback.
        unsafe { std::mem::zeroed() }
    }
}

/// Per-entry header data filled in by [`RARReadHeaderEx`].
#[repr(C)]
pub struct RARHeaderDataEx {
    pub ArcName: [c_char; 1024],
    pub ArcNameW: [wchar_t; 1024],
    pub FileName: [c_char; 1024],
    pub FileNameW: [wchar_t; 1024],
    pub Flags: c_uint,
    pub PackSize: c_uint,
    pub PackSizeHigh: c_uint,
    pub UnpSize: c_uint,
    pub UnpSizeHigh: c_uint,
    pub HostOS: c_uint,
    pub FileCRC: c_uint,
    pub FileTime: c_uint,
    pub UnpVer: c_uint,
    pub Method: c_uint,
    pub FileAttr: c_uint,
    pub CmtBuf: *mut c_char,
    pub CmtBufSize: c_uint,
    pub CmtSize: c_uint,
    pub CmtState: c_uint,
    pub DictSize: c_uint,
    pub HashType: c_uint,
    pub Hash: [c_uchar; 32],
    pub RedirType: c_uint,
    pub RedirName: *mut wchar_t,
    pub RedirNameSize: c_uint,
    pub DirTarget: c_uint,
    pub MtimeLow: c_uint,
    pub MtimeHigh: c_uint,
    pub CtimeLow: c_uint,
    pub CtimeHigh: c_uint,
    pub AtimeLow: c_uint,
    pub AtimeHigh: c_uint,
    pub Reserved: [c_uint; 988],
}

impl RARHeaderDataEx {
    /// Returns a fully zeroed struct. The engine requires the comment and
    /// redirect buffer fields to be initialized before every read.
    #[must_use]
    pub fn zeroed() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

unsafe extern "system" {
    /// Opens an archive. On failure returns null and stores the status code
    /// in `ArchiveData.OpenResult`.
    pub fn RAROpenArchiveEx(ArchiveData: *mut RAROpenArchiveDataEx) -> HANDLE;

    /// Closes an archive handle. Returns an `ERAR_*` status.
    pub fn RARCloseArchive(hArcData: HANDLE) -> c_int;

    /// Reads the next entry header. Returns an `ERAR_*` status
    /// (`ERAR_END_ARCHIVE` once the archive is exhausted).
    pub fn RARReadHeaderEx(hArcData: HANDLE, HeaderData: *mut RARHeaderDataEx) -> c_int;

    /// Processes the current entry (`RAR_SKIP` / `RAR_TEST` / `RAR_EXTRACT`).
    /// Invokes the registered callback zero or more times before returning.
    pub fn RARProcessFile(
        hArcData: HANDLE,
        Operation: c_int,
        DestPath: *mut c_char,
        DestName: *mut c_char,
    ) -> c_int;

    /// Wide-character variant of [`RARProcessFile`].
    pub fn RARProcessFileW(
        hArcData: HANDLE,
        Operation: c_int,
        DestPath: *mut wchar_t,
        DestName: *mut wchar_t,
    ) -> c_int;

    /// Replaces the callback registered at open time.
    pub fn RARSetCallback(hArcData: HANDLE, Callback: UNRARCALLBACK, UserData: LPARAM);

    /// Sets a default password for the archive.
    pub fn RARSetPassword(hArcData: HANDLE, Password: *mut c_char);

    /// Returns the engine API version number.
    pub fn RARGetDllVersion() -> c_int;
}
