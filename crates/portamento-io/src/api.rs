//! Backend selection.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies a MIDI backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Api {
    /// Pick the first compiled backend that has ports.
    #[default]
    Unspecified,
    /// ALSA, CoreMIDI or WinMM through `midir`.
    Midir,
    /// In-process virtual bus.
    Loopback,
    /// Compiles everywhere, does nothing.
    Dummy,
}

impl Api {
    /// Backends compiled into this build, in order of preference.
    pub fn compiled() -> Vec<Api> {
        let mut apis = Vec::with_capacity(3);
        #[cfg(feature = "midi-io")]
        apis.push(Api::Midir);
        apis.push(Api::Loopback);
        apis.push(Api::Dummy);
        apis
    }

    pub fn is_compiled(self) -> bool {
        self == Api::Unspecified || Self::compiled().contains(&self)
    }

    /// Short identifier, stable across releases.
    pub fn name(self) -> &'static str {
        match self {
            Api::Unspecified => "unspecified",
            Api::Midir => "midir",
            Api::Loopback => "loopback",
            Api::Dummy => "dummy",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Api::Unspecified => "Unspecified",
            Api::Midir => "Native (midir)",
            Api::Loopback => "Loopback",
            Api::Dummy => "Dummy",
        }
    }

    /// Case-insensitive lookup by short name.
    pub fn from_name(name: &str) -> Option<Api> {
        [Api::Unspecified, Api::Midir, Api::Loopback, Api::Dummy]
            .into_iter()
            .find(|api| api.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Api {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Api::from_name(s).ok_or_else(|| Error::invalid_parameter(format!("unknown MIDI API '{s}'")))
    }
}

/// Backends compiled into this build.
pub fn compiled_apis() -> Vec<Api> {
    Api::compiled()
}
