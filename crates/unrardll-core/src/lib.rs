//! Engine-independent building blocks for the unrar session bindings.
//!
//! Everything in this crate is testable without Python and without the
//! native unrar library: the status-code taxonomy, wide-character buffer
//! marshaling, the file-descriptor sink with its retry discipline, and the
//! 64-bit size reconstruction used by entry headers.

#![warn(missing_docs)]

pub mod status;
pub mod wide;

#[cfg(unix)]
pub mod sink;

pub use status::RarStatus;
pub use wide::WideError;

/// Maximum archive comment size in bytes. The RAR 5.0 format caps comments
/// at 256 KiB; twice that leaves headroom for older formats. Larger comments
/// are truncated by the engine, which is not an error.
pub const MAX_COMMENT_SIZE: usize = 512 * 1024;

/// Capacity, in wide characters, of the archive path buffer handed to the
/// engine at open time.
pub const PATH_BUFFER_CAPACITY: usize = 4096;

/// Reconstructs a 64-bit size from the engine's high/low 32-bit pair.
///
/// Header size fields must always go through this; the raw 32-bit `low`
/// field alone is wrong for entries larger than 4 GiB.
#[must_use]
pub fn combine(high: u32, low: u32) -> u64 {
    (u64::from(high) << 32) | u64::from(low)
}
