//! Translation of native status codes and marshaling failures into Python
//! exceptions.

use pyo3::create_exception;
use pyo3::exceptions::PyException;
use pyo3::exceptions::PyMemoryError;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use unrardll_core::RarStatus;
use unrardll_core::WideError;

create_exception!(
    unrar,
    UNRARError,
    PyException,
    "Raised for native engine failures and recorded callback failures."
);

/// Converts a native status code into the Python exception surfaced to the
/// caller. The status name is the message; allocation failure is reported
/// as the distinct `MemoryError` condition.
pub(crate) fn status_to_py(status: RarStatus) -> PyErr {
    match status {
        RarStatus::NoMemory => PyMemoryError::new_err(status.name()),
        _ => UNRARError::new_err(status.name()),
    }
}

/// Converts a wide-character marshaling failure into a `ValueError`, raised
/// before any native call is attempted.
pub(crate) fn wide_to_py(err: WideError, what: &str) -> PyErr {
    PyValueError::new_err(format!("{what}: {err}"))
}

/// Registers the exception types on the module.
pub(crate) fn register_exceptions(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("UNRARError", m.py().get_type::<UNRARError>())?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_carry_the_status_name() {
        pyo3::Python::initialize();
        Python::attach(|py| {
            for (status, name) in [
                (RarStatus::BadData, "ERAR_BAD_DATA"),
                (RarStatus::Open, "ERAR_EOPEN"),
                (RarStatus::MissingPassword, "ERAR_MISSING_PASSWORD"),
                (RarStatus::Unknown, "ERAR_UNKNOWN"),
            ] {
                let err = status_to_py(status);
                assert!(
                    err.is_instance_of::<UNRARError>(py),
                    "{name} must raise UNRARError"
                );
                let message = err.to_string();
                assert!(
                    message.contains(name),
                    "expected {name} in message, got: {message}"
                );
            }
        });
    }

    #[test]
    fn out_of_memory_raises_memory_error() {
        pyo3::Python::initialize();
        Python::attach(|py| {
            let err = status_to_py(RarStatus::NoMemory);
            assert!(
                err.is_instance_of::<PyMemoryError>(py),
                "allocation failure must raise MemoryError, not UNRARError"
            );
        });
    }

    #[test]
    fn marshaling_failures_raise_value_error() {
        pyo3::Python::initialize();
        Python::attach(|py| {
            let err = wide_to_py(WideError::TooLong { capacity: 4096 }, "invalid archive path");
            assert!(
                err.is_instance_of::<PyValueError>(py),
                "marshaling failures must raise ValueError"
            );
            let message = err.to_string();
            assert!(
                message.contains("invalid archive path") && message.contains("4096"),
                "message must carry context and capacity, got: {message}"
            );
        });
    }

    #[test]
    fn register_exceptions_adds_the_error_type() {
        pyo3::Python::initialize();
        Python::attach(|py| {
            let module = PyModule::new(py, "test_unrar").expect("failed to create test module");
            register_exceptions(&module).expect("failed to register exceptions");
            assert!(
                module.getattr("UNRARError").is_ok(),
                "UNRARError not registered"
            );
        });
    }
}
