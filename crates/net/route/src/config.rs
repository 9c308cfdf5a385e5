//! Route selector configuration.

use serde::{Deserialize, Serialize};

/// Route selection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Bind the route to the interface owning an explicit source address.
    pub select_srcif: bool,
    /// Accept a source address owned by an ND-proxying interface when no
    /// interface in the requested scope owns it.
    pub proxy_forwarding: bool,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            select_srcif: true,
            proxy_forwarding: false,
        }
    }
}
