//! Taxonomy of native engine status codes.

use std::fmt;

// Raw ERAR_* values from the engine's dll.hpp. Kept private; callers go
// through RarStatus.
const SUCCESS: u32 = 0;
const END_ARCHIVE: u32 = 10;
const NO_MEMORY: u32 = 11;
const BAD_DATA: u32 = 12;
const BAD_ARCHIVE: u32 = 13;
const UNKNOWN_FORMAT: u32 = 14;
const EOPEN: u32 = 15;
const ECREATE: u32 = 16;
const ECLOSE: u32 = 17;
const EREAD: u32 = 18;
const EWRITE: u32 = 19;
const SMALL_BUF: u32 = 20;
const UNKNOWN: u32 = 21;
const MISSING_PASSWORD: u32 = 22;
const EREFERENCE: u32 = 23;
const BAD_PASSWORD: u32 = 24;

/// The closed set of status codes the unrar engine reports.
///
/// Codes the engine may grow in future versions map to [`RarStatus::Unknown`]
/// rather than failing, so a newer native library never breaks translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RarStatus {
    /// Operation completed.
    Success,
    /// No more entry headers in the archive. Not an error.
    EndArchive,
    /// The engine could not allocate memory.
    NoMemory,
    /// Archive data is corrupt, or a wrong password was supplied to an
    /// archive with encrypted data (RAR 4 and older).
    BadData,
    /// The file is not a valid RAR archive.
    BadArchive,
    /// The archive format was not recognized.
    UnknownFormat,
    /// The archive (or a volume of it) could not be opened.
    Open,
    /// A destination file could not be created.
    Create,
    /// A file could not be closed.
    Close,
    /// A read failed.
    Read,
    /// A write failed.
    Write,
    /// A caller-supplied buffer was too small.
    SmallBuf,
    /// Unclassified failure, including operations aborted by a callback.
    Unknown,
    /// A password was required but none was supplied.
    MissingPassword,
    /// A reference entry could not be resolved.
    Reference,
    /// The supplied password is wrong (RAR 5 with encrypted headers).
    BadPassword,
}

impl RarStatus {
    /// Translates a raw engine status code, mapping unrecognized codes to
    /// [`RarStatus::Unknown`].
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        match code {
            SUCCESS => Self::Success,
            END_ARCHIVE => Self::EndArchive,
            NO_MEMORY => Self::NoMemory,
            BAD_DATA => Self::BadData,
            BAD_ARCHIVE => Self::BadArchive,
            UNKNOWN_FORMAT => Self::UnknownFormat,
            EOPEN => Self::Open,
            ECREATE => Self::Create,
            ECLOSE => Self::Close,
            EREAD => Self::Read,
            EWRITE => Self::Write,
            SMALL_BUF => Self::SmallBuf,
            MISSING_PASSWORD => Self::MissingPassword,
            EREFERENCE => Self::Reference,
            BAD_PASSWORD => Self::BadPassword,
            UNKNOWN => Self::Unknown,
            _ => Self::Unknown,
        }
    }

    /// The canonical `ERAR_*` name of this status, used verbatim as the
    /// host-visible error message.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "ERAR_SUCCESS",
            Self::EndArchive => "ERAR_END_ARCHIVE",
            Self::NoMemory => "ERAR_NO_MEMORY",
            Self::BadData => "ERAR_BAD_DATA",
            Self::BadArchive => "ERAR_BAD_ARCHIVE",
            Self::UnknownFormat => "ERAR_UNKNOWN_FORMAT",
            Self::Open => "ERAR_EOPEN",
            Self::Create => "ERAR_ECREATE",
            Self::Close => "ERAR_ECLOSE",
            Self::Read => "ERAR_EREAD",
            Self::Write => "ERAR_EWRITE",
            Self::SmallBuf => "ERAR_SMALL_BUF",
            Self::Unknown => "ERAR_UNKNOWN",
            Self::MissingPassword => "ERAR_MISSING_PASSWORD",
            Self::Reference => "ERAR_EREFERENCE",
            Self::BadPassword => "ERAR_BAD_PASSWORD",
        }
    }

    /// Returns true for [`RarStatus::Success`].
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for RarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
