//! Store sizing configuration.

use serde::Deserialize;

/// Capacity hints applied when the store and its bags are allocated.
///
/// Neither value is a bound: the store grows without limit until the
/// owning pipeline clears its requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Expected number of in-flight request ids.
    pub initial_capacity: usize,
    /// Expected number of keys per request.
    pub bag_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            bag_capacity: 8,
        }
    }
}

impl StoreConfig {
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_bag_capacity(mut self, capacity: usize) -> Self {
        self.bag_capacity = capacity;
        self
    }
}
