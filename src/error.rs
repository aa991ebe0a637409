//! Centralized error type for the portamento umbrella crate.
//!
//! Wraps the subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Input(#[from] portamento_input::Error),

    #[error(transparent)]
    Io(#[from] portamento_io::Error),
}

impl Error {
    /// Warnings are reported, never fatal.
    pub fn is_warning(&self) -> bool {
        match self {
            Error::Input(e) => e.is_warning(),
            Error::Io(e) => e.is_warning(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
