//! Error types for the MIDI I/O facades and backends.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Misuse, invalid parameters and warnings raised by the dispatch core.
    #[error(transparent)]
    Input(#[from] portamento_input::Error),

    #[error("no MIDI devices found")]
    NoDevicesFound,

    #[error("invalid device: {0}")]
    InvalidDevice(String),

    /// The system MIDI service reported a failure.
    #[error("MIDI driver error: {0}")]
    Driver(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    pub fn invalid_use(message: impl Into<String>) -> Self {
        Error::Input(portamento_input::Error::InvalidUse(message.into()))
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Error::Input(portamento_input::Error::InvalidParameter(message.into()))
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Error::Input(portamento_input::Error::Warning(message.into()))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Error::Input(inner) if inner.is_warning())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::Driver(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl<T> From<midir::ConnectError<T>> for Error {
    fn from(e: midir::ConnectError<T>) -> Self {
        Error::Driver(e.kind().to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::PortInfoError> for Error {
    fn from(e: midir::PortInfoError) -> Self {
        Error::InvalidDevice(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::SendError> for Error {
    fn from(e: midir::SendError) -> Self {
        Error::Driver(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_display_transparently() {
        insta::assert_snapshot!(
            Error::invalid_use("no port open").to_string(),
            @"invalid use: no port open"
        );
        insta::assert_snapshot!(
            Error::InvalidDevice("port index 3 out of range".into()).to_string(),
            @"invalid device: port index 3 out of range"
        );
    }

    #[test]
    fn test_warning_classification() {
        assert!(Error::warning("redundant open").is_warning());
        assert!(!Error::invalid_use("x").is_warning());
        assert!(!Error::Driver("x".into()).is_warning());
    }
}
