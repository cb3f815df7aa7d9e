//! Conversion between Rust text and the engine's wide-character buffers.
//!
//! `wchar_t` is 32 bits on unix targets and 16 bits on Windows; both widths
//! are handled so the same marshaling code backs every engine build.

use libc::wchar_t;
use thiserror::Error;

/// Failure to marshal text into a fixed-capacity wide-character buffer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WideError {
    /// The text, plus its NUL terminator, does not fit in the buffer.
    #[error("text does not fit in a wide-character buffer of {capacity} units")]
    TooLong {
        /// Capacity of the destination buffer, in wide characters.
        capacity: usize,
    },
}

#[cfg(windows)]
fn units(text: &str) -> impl Iterator<Item = wchar_t> + '_ {
    text.encode_utf16().map(|u| u as wchar_t)
}

#[cfg(not(windows))]
#[allow(clippy::cast_possible_wrap)]
fn units(text: &str) -> impl Iterator<Item = wchar_t> + '_ {
    text.chars().map(|c| c as u32 as wchar_t)
}

/// Encodes `text` into `buf` as a NUL-terminated wide string.
///
/// Returns the number of wide characters written, excluding the terminator.
/// Fails if the encoded text plus terminator exceeds the buffer capacity;
/// the buffer contents are unspecified on failure.
pub fn encode_wide(text: &str, buf: &mut [wchar_t]) -> Result<usize, WideError> {
    let capacity = buf.len();
    if capacity == 0 {
        return Err(WideError::TooLong { capacity });
    }
    let mut written = 0;
    for unit in units(text) {
        // Reserve one slot for the terminator.
        if written + 1 >= capacity {
            return Err(WideError::TooLong { capacity });
        }
        buf[written] = unit;
        written += 1;
    }
    buf[written] = 0;
    Ok(written)
}

/// Decodes a slice of wide characters into a `String`, replacing invalid
/// units with U+FFFD. The slice must not include the NUL terminator; use
/// [`nul_terminated`] to trim a fixed buffer first.
#[must_use]
#[cfg(not(windows))]
pub fn decode_wide(buf: &[wchar_t]) -> String {
    buf.iter()
        .map(|&unit| {
            u32::try_from(unit)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect()
}

/// Decodes a slice of wide characters into a `String`, replacing invalid
/// units with U+FFFD. The slice must not include the NUL terminator; use
/// [`nul_terminated`] to trim a fixed buffer first.
#[must_use]
#[cfg(windows)]
pub fn decode_wide(buf: &[wchar_t]) -> String {
    String::from_utf16_lossy(buf)
}

/// Trims a fixed-capacity buffer at its first NUL, or returns the whole
/// slice if no terminator is present.
#[must_use]
pub fn nul_terminated(buf: &[wchar_t]) -> &[wchar_t] {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    &buf[..len]
}
