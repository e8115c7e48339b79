/// Default interval of the periodic cache metadata and size tasks.
pub(crate) const DEFAULT_PERIOD_SECS: u64 = 30;

pub(crate) const DEFAULT_STATE_CONTAINER: &str = "state";
pub(crate) const DEFAULT_CONFIG_CONTAINER: &str = "config";

/// Subscription target matching every target.
pub(crate) const WILDCARD_TARGET: &str = "*";

/// Root element of the cache metadata leaves.
pub(crate) const META_ROOT: &str = "meta";

pub(crate) const GNMI_VERSION: &str = "0.8.0";
