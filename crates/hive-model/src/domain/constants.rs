//! Well-known names shared by the model and the core.
//!
//! Keeping them here avoids scattering magic strings throughout the codebase.

/// Prefix carried by every label the panel owns, on the cluster object and on services.
pub const LABEL_PREFIX: &str = "hive.";

/// Name of the routing-mesh network every swarm creates on init.
pub const INGRESS_NETWORK: &str = "ingress";

/// Overlay network created by the panel when no usable overlay exists yet.
pub const DEFAULT_NETWORK: &str = "hivenet";

/// Service name of the legacy control plane that can be migrated in place.
pub const LEGACY_CONTROL_SERVICE: &str = "captain-captain";

/// Overlay network the legacy control plane expects to be attached to.
pub const LEGACY_CONTROL_NETWORK: &str = "captain-overlay-network";
