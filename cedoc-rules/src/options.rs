//! Session options and limits.

use serde::Deserialize;

/// Format version accepted by default.
pub const DEFAULT_VERSION: u64 = 1;

/// Options for one validation session.
///
/// Count limits of `0` mean unlimited. Hosts can load these from any serde
/// format; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuleOptions {
    /// Version a `Version` event must declare.
    pub version: u64,
    /// Maximum nesting of containers.
    pub max_container_depth: usize,
    /// Maximum payload size of a single array, in bytes.
    pub max_array_size: u64,
    /// Maximum identifier length, in bytes.
    pub max_identifier_length: usize,
    pub max_object_count: u64,
    pub max_marker_count: u64,
    pub max_reference_count: u64,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION,
            max_container_depth: 1000,
            max_array_size: 1 << 30,
            max_identifier_length: 1000,
            max_object_count: 0,
            max_marker_count: 0,
            max_reference_count: 0,
        }
    }
}

impl RuleOptions {
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn with_max_container_depth(mut self, depth: usize) -> Self {
        self.max_container_depth = depth;
        self
    }

    pub fn with_max_array_size(mut self, bytes: u64) -> Self {
        self.max_array_size = bytes;
        self
    }

    pub fn with_max_identifier_length(mut self, bytes: usize) -> Self {
        self.max_identifier_length = bytes;
        self
    }

    pub fn with_max_object_count(mut self, count: u64) -> Self {
        self.max_object_count = count;
        self
    }

    pub fn with_max_marker_count(mut self, count: u64) -> Self {
        self.max_marker_count = count;
        self
    }

    pub fn with_max_reference_count(mut self, count: u64) -> Self {
        self.max_reference_count = count;
        self
    }
}

/// True if `count` has gone past a limit where `0` means unlimited.
#[inline]
pub(crate) fn over_limit(count: u64, max: u64) -> bool {
    max != 0 && count > max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let opts = RuleOptions::default()
            .with_version(2)
            .with_max_container_depth(4)
            .with_max_marker_count(10);
        assert_eq!(opts.version, 2);
        assert_eq!(opts.max_container_depth, 4);
        assert_eq!(opts.max_marker_count, 10);
        assert_eq!(opts.max_array_size, RuleOptions::default().max_array_size);
    }

    #[test]
    fn zero_means_unlimited() {
        assert!(!over_limit(u64::MAX, 0));
        assert!(!over_limit(3, 3));
        assert!(over_limit(4, 3));
    }
}
