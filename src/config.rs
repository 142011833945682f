use crate::enums::DegeneratePolicy;

use std::time::Duration;

/// Settings of a [`VolumeLoader`](crate::volume_loader::VolumeLoader)
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Maximum number of slices decoded at once, rayon's default when `None`
    pub concurrency: Option<usize>,
    /// Time allowed to decode one slice in the async loader
    pub decode_timeout: Duration,
    pub degenerate_policy: DegeneratePolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            concurrency: None,
            decode_timeout: Duration::from_secs(30),
            degenerate_policy: DegeneratePolicy::default(),
        }
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode at most `limit` slices at once. `0` is treated as `1`.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit.max(1));
        self
    }

    pub fn with_decode_timeout(mut self, timeout: Duration) -> Self {
        self.decode_timeout = timeout;
        self
    }

    pub fn with_degenerate_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.degenerate_policy = policy;
        self
    }

    pub(crate) fn concurrency_limit(&self) -> usize {
        self.concurrency
            .unwrap_or_else(rayon::current_num_threads)
            .max(1)
    }
}
