//! The callback multiplexer handed to the native engine.
//!
//! The engine invokes [`unrar_callback`] synchronously, on the calling
//! thread, from inside its open / scan / process calls, while the GIL is
//! released. Handlers that touch a Python object bracket that access in
//! [`Python::attach`]; handlers that touch none (volume acknowledgment,
//! descriptor writes) never take the GIL. A Python exception raised by the
//! callback object is captured into the session's failure record and
//! dropped, so no host error state ever crosses back into the engine.

use std::ffi::c_int;
use std::ffi::c_uint;

use libc::wchar_t;
use pyo3::intern;
use pyo3::prelude::*;
use pyo3::types::PyBytes;
use unrar_sys as ffi;
use unrardll_core::wide;

#[cfg(unix)]
use crate::session::CALLBACK_SINK;
use crate::session::Operation;

/// Outcome acknowledging the event and continuing the operation.
const CONTINUE: c_int = 0;
/// Outcome aborting the operation; the engine then returns a failure status.
const ABORT: c_int = -1;

/// Entry point registered with the engine at open time. `user_data` is the
/// address of the session's [`Operation`].
///
/// # Safety
///
/// Invoked only by the engine, with `user_data` pointing at the `Operation`
/// registered alongside it and with `p1`/`p2` shaped per message class.
pub(crate) unsafe extern "system" fn unrar_callback(
    msg: c_uint,
    user_data: ffi::LPARAM,
    p1: ffi::LPARAM,
    p2: ffi::LPARAM,
) -> c_int {
    if user_data == 0 {
        return ABORT;
    }
    let op = unsafe { &*(user_data as *const Operation) };
    match msg {
        ffi::UCM_CHANGEVOLUME | ffi::UCM_CHANGEVOLUMEW => on_volume_change(op, p2),
        ffi::UCM_NEEDPASSWORDW => on_password_request(op, p1, p2),
        // The engine always asks for a wide password before trying the ansi
        // variant, so the ansi request is left unanswered.
        ffi::UCM_NEEDPASSWORD => ABORT,
        ffi::UCM_PROCESSDATA => on_data_chunk(op, p1, p2),
        _ => ABORT,
    }
}

/// Multi-part archives: acknowledge volumes the engine found on its own,
/// abort when it asks us to locate one. Touches no Python objects.
fn on_volume_change(op: &Operation, p2: ffi::LPARAM) -> c_int {
    if p2 == ffi::RAR_VOL_NOTIFY {
        CONTINUE
    } else {
        op.record_failure("Could not find next part of a multi-part archive");
        ABORT
    }
}

/// Asks the callback object for a password and writes it into the engine's
/// wide-character buffer at `p1` (capacity `p2`, in wide characters).
fn on_password_request(op: &Operation, p1: ffi::LPARAM, p2: ffi::LPARAM) -> c_int {
    if p2 <= 0 {
        op.record_failure(format!(
            "Invalid password buffer length sent to callback: {p2}"
        ));
        return ABORT;
    }
    let Some(callback) = op.callback.as_ref() else {
        op.record_failure("No callback provided");
        return ABORT;
    };
    // Only the low 32 bits of the length are meaningful; the high bits are
    // sign-extension noise on some platforms.
    #[allow(clippy::cast_sign_loss)]
    let capacity = (p2 as usize) & 0xffff_ffff;
    let buf = unsafe { std::slice::from_raw_parts_mut(p1 as *mut wchar_t, capacity) };

    Python::attach(|py| match callback.bind(py).call_method0(intern!(py, "_get_password")) {
        Err(_) => {
            // Exception captured here and dropped; it must not leak into a
            // later, unrelated call.
            op.record_failure("An exception occurred in the password callback handler");
            ABORT
        }
        // Declining quietly lets the engine report the missing password.
        Ok(pw) if pw.is_none() => ABORT,
        Ok(pw) => match pw.extract::<String>() {
            Err(_) => {
                op.record_failure("The password callback handler did not return a unicode object");
                ABORT
            }
            Ok(password) => match wide::encode_wide(&password, buf) {
                Ok(_) => CONTINUE,
                Err(_) => {
                    op.record_failure("The password does not fit in the buffer provided by unrar");
                    ABORT
                }
            },
        },
    })
}

/// Delivers a decoded chunk either straight to the selected file descriptor
/// or to the callback object's data-processing method.
fn on_data_chunk(op: &Operation, p1: ffi::LPARAM, p2: ffi::LPARAM) -> c_int {
    if p2 < 0 {
        op.record_failure(format!("Invalid buffer length sent to callback: {p2}"));
        return ABORT;
    }
    #[allow(clippy::cast_sign_loss)]
    let len = (p2 as usize) & 0xffff_ffff;
    let data: &[u8] = if len == 0 || p1 == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(p1 as *const u8, len) }
    };

    #[cfg(unix)]
    {
        let fd = op.output_fd();
        if fd > CALLBACK_SINK {
            // Direct-sink mode: no Python object involved, so the GIL stays
            // released for the whole write.
            return match unrardll_core::sink::write_all(fd, data) {
                Ok(()) => CONTINUE,
                Err(err) => {
                    op.record_failure(format!(
                        "Failed to write all bytes to output file. Error: {err}"
                    ));
                    ABORT
                }
            };
        }
    }

    let Some(callback) = op.callback.as_ref() else {
        op.record_failure("No callback provided");
        return ABORT;
    };
    Python::attach(|py| {
        let chunk = PyBytes::new(py, data);
        match callback
            .bind(py)
            .call_method1(intern!(py, "_process_data"), (chunk,))
        {
            Err(_) => {
                op.record_failure("An exception occurred in the data callback handler");
                ABORT
            }
            Ok(result) => match result.is_truthy() {
                Ok(true) => CONTINUE,
                Ok(false) | Err(_) => {
                    op.record_failure("Processing canceled by the callback");
                    ABORT
                }
            },
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pyo3::types::PyDict;

    use super::*;

    /// Runs `source` and returns the object it bound to the name `cb`.
    fn python_callback(py: Python<'_>, source: &std::ffi::CStr) -> Py<PyAny> {
        let locals = PyDict::new(py);
        py.run(source, None, Some(&locals)).unwrap();
        locals.get_item("cb").unwrap().unwrap().unbind()
    }

    #[test]
    fn volume_notify_is_acknowledged() {
        let op = Operation::new(None);
        assert_eq!(
            on_volume_change(&op, ffi::RAR_VOL_NOTIFY),
            CONTINUE,
            "a volume the engine found itself must be acknowledged"
        );
        assert_eq!(op.last_failure(), None, "acknowledgment records no failure");
    }

    #[test]
    fn volume_ask_aborts_and_records() {
        let op = Operation::new(None);
        assert_eq!(
            on_volume_change(&op, ffi::RAR_VOL_ASK),
            ABORT,
            "a missing volume must abort the operation"
        );
        let failure = op.last_failure().unwrap();
        assert!(
            failure.contains("multi-part"),
            "failure must name the multi-part condition, got: {failure}"
        );
    }

    #[test]
    fn password_request_without_callback_fails() {
        let op = Operation::new(None);
        let mut buf = [0 as wchar_t; 128];
        let outcome = on_password_request(&op, buf.as_mut_ptr() as ffi::LPARAM, 128);
        assert_eq!(outcome, ABORT, "no callback object means no password");
        assert_eq!(
            op.last_failure().as_deref(),
            Some("No callback provided"),
            "the no-callback condition must be recorded verbatim"
        );
    }

    #[test]
    fn password_request_rejects_bad_buffer_length() {
        let op = Operation::new(None);
        for bad_len in [0, -3] {
            let outcome = on_password_request(&op, 0, bad_len);
            assert_eq!(outcome, ABORT, "length {bad_len} must abort");
            let failure = op.last_failure().unwrap();
            assert!(
                failure.contains("Invalid password buffer length"),
                "failure must name the bad length, got: {failure}"
            );
        }
    }

    #[test]
    fn data_chunk_with_negative_length_records_without_writing() {
        let op = Operation::new(None);
        let outcome = on_data_chunk(&op, 0, -1);
        assert_eq!(outcome, ABORT, "a negative length must abort");
        let failure = op.last_failure().unwrap();
        assert!(
            failure.contains("Invalid buffer length"),
            "failure must name the bad length, got: {failure}"
        );
    }

    #[test]
    fn data_chunk_without_callback_or_descriptor_fails() {
        let op = Operation::new(None);
        let payload = b"chunk";
        let outcome = on_data_chunk(&op, payload.as_ptr() as ffi::LPARAM, payload.len() as ffi::LPARAM);
        assert_eq!(outcome, ABORT, "callback mode without a callback must abort");
        assert_eq!(op.last_failure().as_deref(), Some("No callback provided"));
    }

    #[test]
    fn data_chunk_reaches_the_callback_object() {
        pyo3::Python::initialize();
        let cb = Python::attach(|py| {
            python_callback(
                py,
                c"class Cb:\n    def __init__(self):\n        self.chunks = []\n    def _process_data(self, data):\n        self.chunks.append(bytes(data))\n        return True\ncb = Cb()\n",
            )
        });
        let op = Operation::new(Some(cb));
        let payload = b"decoded bytes";
        let outcome = on_data_chunk(&op, payload.as_ptr() as ffi::LPARAM, payload.len() as ffi::LPARAM);
        assert_eq!(outcome, CONTINUE, "a truthy handler result must acknowledge");
        assert_eq!(op.last_failure(), None, "a delivered chunk records no failure");
        Python::attach(|py| {
            let chunks: Vec<Vec<u8>> = op
                .callback
                .as_ref()
                .unwrap()
                .bind(py)
                .getattr("chunks")
                .unwrap()
                .extract()
                .unwrap();
            assert_eq!(
                chunks,
                vec![payload.to_vec()],
                "the handler must receive the chunk bytes unchanged"
            );
        });
    }

    #[test]
    fn data_chunk_canceled_by_the_callback_records() {
        pyo3::Python::initialize();
        let cb = Python::attach(|py| {
            python_callback(
                py,
                c"class Cb:\n    def _process_data(self, data):\n        return False\ncb = Cb()\n",
            )
        });
        let op = Operation::new(Some(cb));
        let payload = b"chunk";
        let outcome = on_data_chunk(&op, payload.as_ptr() as ffi::LPARAM, payload.len() as ffi::LPARAM);
        assert_eq!(outcome, ABORT, "a falsy handler result must abort extraction");
        assert_eq!(
            op.last_failure().as_deref(),
            Some("Processing canceled by the callback"),
            "cancellation must be recorded for the caller"
        );
    }

    #[test]
    fn data_handler_exception_is_captured() {
        pyo3::Python::initialize();
        let cb = Python::attach(|py| {
            python_callback(
                py,
                c"class Cb:\n    def _process_data(self, data):\n        raise RuntimeError('disk full')\ncb = Cb()\n",
            )
        });
        let op = Operation::new(Some(cb));
        let payload = b"chunk";
        let outcome = on_data_chunk(&op, payload.as_ptr() as ffi::LPARAM, payload.len() as ffi::LPARAM);
        assert_eq!(outcome, ABORT, "a raising handler must abort extraction");
        assert_eq!(
            op.last_failure().as_deref(),
            Some("An exception occurred in the data callback handler"),
            "the exception must land in the failure record, not leak"
        );
    }

    #[test]
    fn password_request_writes_the_returned_password() {
        pyo3::Python::initialize();
        let cb = Python::attach(|py| {
            python_callback(
                py,
                c"class Cb:\n    def _get_password(self):\n        return 'sekrit'\ncb = Cb()\n",
            )
        });
        let op = Operation::new(Some(cb));
        let mut buf = [0 as wchar_t; 128];
        let outcome = on_password_request(&op, buf.as_mut_ptr() as ffi::LPARAM, buf.len() as ffi::LPARAM);
        assert_eq!(outcome, CONTINUE, "a returned password must acknowledge");
        assert_eq!(op.last_failure(), None, "a good password records no failure");
        assert_eq!(
            wide::decode_wide(wide::nul_terminated(&buf)),
            "sekrit",
            "the password must land in the engine buffer"
        );
    }

    #[test]
    fn password_handler_exception_is_captured() {
        pyo3::Python::initialize();
        let cb = Python::attach(|py| {
            python_callback(
                py,
                c"class Cb:\n    def _get_password(self):\n        raise KeyError('no stored password')\ncb = Cb()\n",
            )
        });
        let op = Operation::new(Some(cb));
        let mut buf = [0 as wchar_t; 128];
        let outcome = on_password_request(&op, buf.as_mut_ptr() as ffi::LPARAM, buf.len() as ffi::LPARAM);
        assert_eq!(outcome, ABORT, "a raising handler means no password");
        assert_eq!(
            op.last_failure().as_deref(),
            Some("An exception occurred in the password callback handler"),
            "the exception must land in the failure record, not leak"
        );
    }

    #[cfg(unix)]
    #[test]
    fn data_chunk_direct_sink_writes_to_descriptor() {
        use std::io::Read;
        use std::os::unix::io::AsRawFd;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk.bin");
        let file = std::fs::File::create(&path).unwrap();

        let op = Operation::new(None);
        op.set_output_fd(file.as_raw_fd());
        let payload = b"decoded bytes";
        let outcome = on_data_chunk(&op, payload.as_ptr() as ffi::LPARAM, payload.len() as ffi::LPARAM);
        assert_eq!(outcome, CONTINUE, "a successful write must acknowledge");
        assert_eq!(op.last_failure(), None);
        drop(file);

        let mut written = Vec::new();
        std::fs::File::open(&path)
            .unwrap()
            .read_to_end(&mut written)
            .unwrap();
        assert_eq!(written, payload, "the whole chunk must reach the descriptor");
    }

    #[cfg(unix)]
    #[test]
    fn data_chunk_direct_sink_write_failure_aborts() {
        let op = Operation::new(None);
        op.set_output_fd(i32::MAX); // certainly not an open descriptor
        let payload = b"data";
        let outcome = on_data_chunk(&op, payload.as_ptr() as ffi::LPARAM, payload.len() as ffi::LPARAM);
        assert_eq!(outcome, ABORT, "an unwritable descriptor must abort");
        let failure = op.last_failure().unwrap();
        assert!(
            failure.contains("Failed to write all bytes"),
            "failure must describe the write error, got: {failure}"
        );
    }

    #[test]
    fn unknown_message_class_aborts() {
        let op = Operation::new(None);
        let user_data = std::ptr::from_ref::<Operation>(&op) as ffi::LPARAM;
        let outcome = unsafe { unrar_callback(999, user_data, 0, 0) };
        assert_eq!(outcome, ABORT, "unknown event classes must abort");
    }

    #[test]
    fn null_user_data_aborts() {
        let outcome = unsafe { unrar_callback(ffi::UCM_PROCESSDATA, 0, 0, 0) };
        assert_eq!(outcome, ABORT, "a callback without session state must abort");
    }
}
