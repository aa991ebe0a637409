//! Port descriptors.

use crate::api::Api;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// One entry of a backend's port list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    pub index: usize,
    pub name: String,
    pub direction: PortDirection,
    pub api: Api,
}

/// Index of the first port whose name contains `pattern`, ignoring case.
pub(crate) fn find_by_name(ports: &[PortInfo], pattern: &str) -> Option<usize> {
    let pattern = pattern.to_lowercase();
    ports
        .iter()
        .find(|port| port.name.to_lowercase().contains(&pattern))
        .map(|port| port.index)
}
