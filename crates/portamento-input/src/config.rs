//! Input configuration.

use crate::error::{Error, Result};
use crate::filter::IgnoreFlags;
use serde::{Deserialize, Serialize};

/// Default bound of the inbound message queue.
pub const DEFAULT_QUEUE_SIZE_LIMIT: usize = 100;

pub const DEFAULT_CLIENT_NAME: &str = "Portamento Input Client";

/// Settings fixed when an input is constructed.
///
/// Missing fields fall back to their defaults when deserialized, so a
/// settings file only has to mention what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Name the backend registers its client under.
    pub client_name: String,
    /// Capacity of the inbound queue used in polling mode.
    pub queue_size_limit: usize,
    pub ignore: IgnoreFlags,
}

impl InputConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_size_limit == 0 {
            return Err(Error::InvalidParameter(
                "queue size limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            queue_size_limit: DEFAULT_QUEUE_SIZE_LIMIT,
            ignore: IgnoreFlags::default(),
        }
    }
}
