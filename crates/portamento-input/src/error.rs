//! Error types for the MIDI input core.
//!
//! Misuse of the public operations is returned as `Err`. Warnings never are:
//! they go to the registered [`ErrorCallback`] and to `tracing`, and the
//! dispatch pipeline keeps running.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Non-critical anomaly (dropped message, reassembly reset).
    #[error("warning: {0}")]
    Warning(String),

    #[error("debug warning: {0}")]
    DebugWarning(String),

    /// The operation was called in a state where it is not allowed.
    #[error("invalid use: {0}")]
    InvalidUse(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Warning,
    DebugWarning,
    InvalidUse,
    InvalidParameter,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Warning(_) => ErrorKind::Warning,
            Error::DebugWarning(_) => ErrorKind::DebugWarning,
            Error::InvalidUse(_) => ErrorKind::InvalidUse,
            Error::InvalidParameter(_) => ErrorKind::InvalidParameter,
        }
    }

    /// True for reports that do not interrupt anything.
    pub fn is_warning(&self) -> bool {
        matches!(self.kind(), ErrorKind::Warning | ErrorKind::DebugWarning)
    }

    pub(crate) fn invalid_use(message: impl Into<String>) -> Self {
        Error::InvalidUse(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Observer for errors and warnings raised outside of a direct call.
///
/// Invoked on whatever thread detected the condition, which for input
/// warnings is the backend's driver thread.
pub struct ErrorCallback {
    handler: Box<dyn Fn(&Error) + Send + Sync>,
}

impl ErrorCallback {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
        }
    }

    #[inline]
    pub fn report(&self, error: &Error) {
        (self.handler)(error)
    }
}

impl std::fmt::Debug for ErrorCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorCallback").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_error_display() {
        insta::assert_snapshot!(
            Error::InvalidUse("no callback set".into()).to_string(),
            @"invalid use: no callback set"
        );
        insta::assert_snapshot!(
            Error::Warning("message queue limit reached".into()).to_string(),
            @"warning: message queue limit reached"
        );
    }

    #[test]
    fn test_warning_classification() {
        assert!(Error::Warning(String::new()).is_warning());
        assert!(Error::DebugWarning(String::new()).is_warning());
        assert!(!Error::InvalidUse(String::new()).is_warning());
        assert!(!Error::InvalidParameter(String::new()).is_warning());
        assert_eq!(
            Error::InvalidParameter(String::new()).kind(),
            ErrorKind::InvalidParameter
        );
    }

    #[test]
    fn test_error_callback_reports() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let callback = ErrorCallback::new(move |error| {
            assert!(error.is_warning());
            seen.fetch_add(1, Ordering::SeqCst);
        });

        callback.report(&Error::Warning("one".into()));
        callback.report(&Error::Warning("two".into()));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
